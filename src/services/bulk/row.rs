//! One CSV line as an ordered header → value mapping.

use csv::StringRecord;

/// A single data line of an uploaded CSV, keyed by the header line.
///
/// Column order follows the file. Lookups are exact on the header text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRow {
    fields: Vec<(String, String)>,
}

impl BatchRow {
    /// Pair a record with the file's headers. Extra values without a header
    /// are dropped; missing trailing values are simply absent.
    pub fn from_record(headers: &StringRecord, record: &StringRecord) -> Self {
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        Self { fields }
    }

    /// Raw value for `header`, if the column exists.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `header` when it is present and not blank.
    pub fn non_empty(&self, header: &str) -> Option<&str> {
        self.get(header).filter(|v| !v.trim().is_empty())
    }

    /// The row's primary identifier. Uploads use either `ID` or `id`.
    pub fn identifier(&self) -> Option<&str> {
        self.non_empty("ID").or_else(|| self.non_empty("id"))
    }
}

impl<H, V> FromIterator<(H, V)> for BatchRow
where
    H: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(h, v)| (h.into(), v.into())).collect(),
        }
    }
}
