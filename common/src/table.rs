use std::collections::HashMap;

use csv::StringRecord;

use crate::error::{Error, Result};

/// Name based access to the fields of CSV rows that share one header.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    column_index: HashMap<String, usize>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let mut column_index = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            if column_index.insert(header.clone(), i).is_some() {
                return Err(Error::DuplicateColumn(header.clone()));
            }
        }
        Ok(Self {
            headers,
            column_index,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Result<usize> {
        self.column_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownColumn(name.to_owned()))
    }

    pub fn get<'r>(&self, row: &'r StringRecord, name: &str) -> Result<&'r str> {
        let index = self.column(name)?;
        row.get(index).ok_or(Error::RowLength {
            len: row.len(),
            expected: self.headers.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let table = Table::new(["a", "b", "c"]).unwrap();
        let row = StringRecord::from(vec!["1", "2", "3"]);
        assert_eq!(table.get(&row, "b").unwrap(), "2");
        assert_eq!(table.column("c").unwrap(), 2);
        assert_eq!(table.headers(), ["a", "b", "c"]);
    }

    #[test]
    fn unknown_column() {
        let table = Table::new(["a"]).unwrap();
        let row = StringRecord::from(vec!["1"]);
        assert!(matches!(
            table.get(&row, "missing"),
            Err(Error::UnknownColumn(name)) if name == "missing"
        ));
    }

    #[test]
    fn duplicate_column() {
        assert!(matches!(
            Table::new(["a", "b", "a"]),
            Err(Error::DuplicateColumn(name)) if name == "a"
        ));
    }

    #[test]
    fn short_row() {
        let table = Table::new(["a", "b"]).unwrap();
        let row = StringRecord::from(vec!["1"]);
        assert!(matches!(
            table.get(&row, "b"),
            Err(Error::RowLength {
                len: 1,
                expected: 2
            })
        ));
    }
}
