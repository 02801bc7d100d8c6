//! Column header vocabularies of the supported export languages.
//!
//! Exports name the same six mandatory columns differently depending on the
//! language the herd management software runs in. Each vocabulary maps onto
//! the canonical [`Column`] set.

use serde::{Deserialize, Serialize};

/// Canonical mandatory columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Subject,
    Date,
    Time,
    Activity,
    Lactation,
    Dim,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Subject,
        Column::Date,
        Column::Time,
        Column::Activity,
        Column::Lactation,
        Column::Dim,
    ];
}

/// Language of the column headings in the export files.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLanguage {
    #[default]
    Eng,
    Ger,
}

const ENGLISH: [(&str, Column); 6] = [
    ("Cow Number", Column::Subject),
    ("Date", Column::Date),
    ("Time", Column::Time),
    ("Activity Change", Column::Activity),
    ("Lactation Number", Column::Lactation),
    ("Days in Lactation", Column::Dim),
];

const GERMAN: [(&str, Column); 6] = [
    ("Kuhnummer", Column::Subject),
    ("Termin", Column::Date),
    ("Zeit", Column::Time),
    ("Aktivität ändern", Column::Activity),
    ("Laktationnummer", Column::Lactation),
    ("Laktationstage", Column::Dim),
];

impl HeaderLanguage {
    fn vocabulary(self) -> &'static [(&'static str, Column); 6] {
        match self {
            HeaderLanguage::Eng => &ENGLISH,
            HeaderLanguage::Ger => &GERMAN,
        }
    }

    /// Header text used for a column in this language.
    pub fn heading(self, column: Column) -> &'static str {
        self.vocabulary()
            .iter()
            .find(|(_, c)| *c == column)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    /// Translate a header cell into its canonical column.
    pub fn translate(self, heading: &str) -> Option<Column> {
        let heading = heading.trim().trim_start_matches('\u{feff}');
        self.vocabulary()
            .iter()
            .find(|(name, _)| *name == heading)
            .map(|(_, c)| *c)
    }

    /// Resolve the position of every mandatory column in a header row.
    ///
    /// Returns the headings that could not be found on failure.
    pub fn locate<'a, I>(self, headers: I) -> Result<ColumnIndex, Vec<&'static str>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions: [Option<usize>; 6] = [None; 6];
        for (pos, heading) in headers.into_iter().enumerate() {
            if let Some(column) = self.translate(heading) {
                let slot = &mut positions[column as usize];
                if slot.is_none() {
                    *slot = Some(pos);
                }
            }
        }

        let missing: Vec<&'static str> = Column::ALL
            .iter()
            .filter(|c| positions[**c as usize].is_none())
            .map(|c| self.heading(*c))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(ColumnIndex {
            positions: positions.map(|p| p.unwrap_or_default()),
        })
    }
}

impl std::fmt::Display for HeaderLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderLanguage::Eng => write!(f, "eng"),
            HeaderLanguage::Ger => write!(f, "ger"),
        }
    }
}

impl std::str::FromStr for HeaderLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eng" => Ok(HeaderLanguage::Eng),
            "ger" => Ok(HeaderLanguage::Ger),
            other => Err(format!("unknown header language '{other}', expected eng or ger")),
        }
    }
}

/// Positions of the mandatory columns within a record.
#[derive(Debug, Clone, Copy)]
pub struct ColumnIndex {
    positions: [usize; 6],
}

impl ColumnIndex {
    pub fn position(&self, column: Column) -> usize {
        self.positions[column as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_both_languages() {
        assert_eq!(HeaderLanguage::Eng.translate("Cow Number"), Some(Column::Subject));
        assert_eq!(HeaderLanguage::Ger.translate("Aktivität ändern"), Some(Column::Activity));
        assert_eq!(HeaderLanguage::Eng.translate("Kuhnummer"), None);
    }

    #[test]
    fn test_locate_ignores_extra_columns() {
        let headers = [
            "Group",
            "Cow Number",
            "Date",
            "Time",
            "Activity Change",
            "Rumination",
            "Lactation Number",
            "Days in Lactation",
        ];
        let index = HeaderLanguage::Eng.locate(headers).unwrap();
        assert_eq!(index.position(Column::Subject), 1);
        assert_eq!(index.position(Column::Lactation), 6);
        assert_eq!(index.position(Column::Dim), 7);
    }

    #[test]
    fn test_locate_reports_missing() {
        let missing = HeaderLanguage::Ger
            .locate(["Kuhnummer", "Termin", "Zeit"])
            .unwrap_err();
        assert_eq!(
            missing,
            vec!["Aktivität ändern", "Laktationnummer", "Laktationstage"]
        );
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("GER".parse::<HeaderLanguage>(), Ok(HeaderLanguage::Ger));
        assert!("fr".parse::<HeaderLanguage>().is_err());
    }
}
