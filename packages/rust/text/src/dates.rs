//! Date grammars: Greek-language and slash-delimited dates to ISO form.
//!
//! Exception tables are consulted first — a handful of published documents
//! carry headings no grammar will ever parse, and their dates are known.

use std::sync::LazyLock;

use regex::Regex;

use parldata_shared::{ParldataError, Result};

use crate::normalize::unaccent_lower;

// [0-9], not \d: the regex crate's \d matches Unicode digits, which the
// numeric conversion below would reject.
static SHORT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})/([0-9]{1,2})[\\/]{0,2}([0-9]{4})").unwrap());

static LONG_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})(?:ης?)? (\w+) ([0-9]{4})").unwrap());

static DOCUMENT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4}-[0-9]{2}-[0-9]{2})(?:-([0-9]))?").unwrap());

/// Greek month names, nominative and genitive, normalized.
static MONTHS: [(&str, u32); 24] = [
    ("ιανουαριος", 1),
    ("ιανουαριου", 1),
    ("φεβρουαριος", 2),
    ("φεβρουαριου", 2),
    ("μαρτιος", 3),
    ("μαρτιου", 3),
    ("απριλιος", 4),
    ("απριλιου", 4),
    ("μαιος", 5),
    ("μαιου", 5),
    ("ιουνιος", 6),
    ("ιουνιου", 6),
    ("ιουλιος", 7),
    ("ιουλιου", 7),
    ("αυγουστος", 8),
    ("αυγουστου", 8),
    ("σεπτεμβριος", 9),
    ("σεπτεμβριου", 9),
    ("οκτωβριος", 10),
    ("οκτωβριου", 10),
    ("νοεμβριος", 11),
    ("νοεμβριου", 11),
    ("δεκεμβριος", 12),
    ("δεκεμβριου", 12),
];

/// Agenda headings with known irregular dates.
static LONG_DATE_EXCEPTIONS: [(&str, &str); 2] = [
    (
        "Συμπληρωματική ημερήσια διάταξη 40-11072013",
        "2013-07-11",
    ),
    (
        "Συμπληρωματική Η.Δ. 17ης Συνεδρίας - 12 12 2013",
        "2013-12-12",
    ),
];

/// Transcript URLs whose embedded date is wrong on the source site.
static DOCUMENT_DATE_EXCEPTIONS: [(&str, (&str, &str)); 1] = [(
    "http://www2.parliament.cy/parliamentgr/008_01/008_02_IC/praktiko2013-12-30.pdf",
    ("2014-01-30", "2014-01-30"),
)];

fn capture_number(digits: &str, date_string: &str) -> Result<u32> {
    digits.parse().map_err(|_| {
        ParldataError::date(format!("non-numeric component in date {date_string:?}"))
    })
}

/// Convert a slash-delimited "short" date into an ISO date.
/// Tolerates a one- or two-digit day and month and a missing or escaped
/// separator before the year.
pub fn parse_short_date(date_string: &str) -> Result<String> {
    let captures = SHORT_DATE.captures(date_string).ok_or_else(|| {
        ParldataError::date(format!("unable to disassemble date in {date_string:?}"))
    })?;
    let (d, m, y) = (
        capture_number(&captures[1], date_string)?,
        capture_number(&captures[2], date_string)?,
        capture_number(&captures[3], date_string)?,
    );
    Ok(format!("{y}-{m:02}-{d:02}"))
}

/// Convert a "long" date in Greek — `"<day>[ης] <month-name> <year>"` —
/// into an ISO date. With `plenary`, known irregular agenda headings are
/// resolved through the exception table first.
pub fn parse_long_date(date_string: &str, plenary: bool) -> Result<String> {
    if plenary {
        for (exception, date) in LONG_DATE_EXCEPTIONS {
            if date_string == exception {
                return Ok(date.into());
            }
        }
    }

    let captures = LONG_DATE.captures(date_string).ok_or_else(|| {
        ParldataError::date(format!("unable to disassemble date in {date_string:?}"))
    })?;
    let day = capture_number(&captures[1], date_string)?;
    let year = capture_number(&captures[3], date_string)?;
    let month_name = unaccent_lower(&captures[2]);
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_name)
        .map(|(_, number)| *number)
        .ok_or_else(|| {
            ParldataError::date(format!("malformed month in date {date_string:?}"))
        })?;
    Ok(format!("{year}-{month:02}-{day:02}"))
}

/// Extract an ISO date plus an optional same-day disambiguator from a
/// document filename or URL.
///
/// Returns `(date, disambiguated_slug)`; `None` when nothing matches, since
/// callers scan arbitrary link text opportunistically.
pub fn parse_document_date(date_string: &str) -> Option<(String, String)> {
    for (exception, (date, slug)) in DOCUMENT_DATE_EXCEPTIONS {
        if date_string == exception {
            return Some((date.into(), slug.into()));
        }
    }

    let captures = DOCUMENT_DATE.captures(date_string.trim())?;
    let date = captures[1].to_string();
    let slug = match captures.get(2) {
        Some(counter) => format!("{date}_{}", counter.as_str()),
        None => date.clone(),
    };
    Some((date, slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_dates() {
        assert_eq!(parse_short_date("3/5/2014").unwrap(), "2014-05-03");
        assert_eq!(parse_short_date("03/05/2014").unwrap(), "2014-05-03");
        // Missing and escaped separators before the year
        assert_eq!(parse_short_date("3/52014").unwrap(), "2014-05-03");
        assert_eq!(parse_short_date(r"03/05\/2014").unwrap(), "2014-05-03");
        assert!(matches!(
            parse_short_date("gibberish"),
            Err(ParldataError::DateParse { .. })
        ));
    }

    #[test]
    fn non_ascii_digits_are_a_date_error() {
        // Arabic-Indic digits; \d would match them, [0-9] must not
        assert!(matches!(
            parse_short_date("٣/٥/2014"),
            Err(ParldataError::DateParse { .. })
        ));
        assert!(matches!(
            parse_long_date("٣ Μαΐου 2014", false),
            Err(ParldataError::DateParse { .. })
        ));
        assert_eq!(parse_document_date("٢٠١٣-01-02"), None);
    }

    #[test]
    fn long_dates() {
        assert_eq!(parse_long_date("3 Μαΐου 2014", false).unwrap(), "2014-05-03");
        assert_eq!(parse_long_date("03 Μαΐου 2014", false).unwrap(), "2014-05-03");
        assert_eq!(parse_long_date("03 μαιου 2014", false).unwrap(), "2014-05-03");
        assert_eq!(
            parse_long_date("23η Οκτωβρίου 2014", false).unwrap(),
            "2014-10-23"
        );
    }

    #[test]
    fn long_date_errors_are_distinct() {
        assert!(matches!(
            parse_long_date("gibberish", false),
            Err(ParldataError::DateParse { .. })
        ));
        let err = parse_long_date("03 05 2014", false).unwrap_err();
        assert!(err.to_string().contains("malformed month"));
    }

    #[test]
    fn long_date_plenary_exceptions() {
        let heading = "Συμπληρωματική ημερήσια διάταξη 40-11072013";
        assert!(parse_long_date(heading, false).is_err());
        assert_eq!(parse_long_date(heading, true).unwrap(), "2013-07-11");
    }

    #[test]
    fn document_dates() {
        assert_eq!(
            parse_document_date("2013-01-02"),
            Some(("2013-01-02".into(), "2013-01-02".into()))
        );
        assert_eq!(
            parse_document_date("2013-01-02-1"),
            Some(("2013-01-02".into(), "2013-01-02_1".into()))
        );
        assert_eq!(
            parse_document_date(
                "http://www2.parliament.cy/parliamentgr/008_01/008_02_IC/praktiko2013-12-30.pdf"
            ),
            Some(("2014-01-30".into(), "2014-01-30".into()))
        );
        assert_eq!(parse_document_date("gibberish"), None);
    }
}
