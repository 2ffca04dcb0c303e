/// Streaming parser for reference-rate RSS feed documents
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::error::{FxError, Result};
use crate::types::RawRateObservation;
use crate::utils::parse_feed_timestamp;

#[derive(Debug, Clone, Copy)]
enum Field {
    Date,
    Value,
    Base,
    Target,
}

/// Fields collected between `<item>` and `</item>`
#[derive(Debug, Default)]
struct PendingEntry {
    date: Option<String>,
    value: Option<String>,
    base: Option<String>,
    target: Option<String>,
}

impl PendingEntry {
    fn set(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Date => &mut self.date,
            Field::Value => &mut self.value,
            Field::Base => &mut self.base,
            Field::Target => &mut self.target,
        };
        slot.get_or_insert_with(String::new).push_str(&text);
    }

    fn into_observation(self) -> std::result::Result<RawRateObservation, String> {
        let raw_date = non_blank(self.date).ok_or("missing date")?;
        let date = parse_feed_timestamp(&raw_date)
            .ok_or_else(|| format!("unparsable date '{}'", raw_date))?;

        let raw_value = non_blank(self.value).ok_or("missing value")?;
        let rate: f64 = raw_value
            .parse()
            .map_err(|_| format!("non-numeric value '{}'", raw_value))?;
        if !rate.is_finite() {
            return Err(format!("non-finite value '{}'", raw_value));
        }

        let pivot_currency = non_blank(self.base).ok_or("missing base currency")?;
        let target_currency = non_blank(self.target).ok_or("missing target currency")?;

        Ok(RawRateObservation {
            date,
            pivot_currency,
            target_currency,
            rate,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lazily yields one observation per well-formed `<item>`.
///
/// Malformed items are skipped. A document that is not well-formed XML ends
/// the sequence with a single `FxError::FeedParse`.
pub struct FeedParser<'a> {
    reader: Reader<&'a [u8]>,
    finished: bool,
    parsed: usize,
    skipped: usize,
}

impl<'a> FeedParser<'a> {
    pub fn new(document: &'a str) -> Self {
        let mut reader = Reader::from_str(document);
        reader.trim_text(true);

        FeedParser {
            reader,
            finished: false,
            parsed: 0,
            skipped: 0,
        }
    }

    pub fn parsed(&self) -> usize {
        self.parsed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn xml_error(&self, err: quick_xml::Error) -> FxError {
        FxError::FeedParse(format!(
            "{} at byte {}",
            err,
            self.reader.buffer_position()
        ))
    }

    /// Read events until the next `</item>`, or `None` at end of document
    fn next_entry(&mut self) -> Result<Option<PendingEntry>> {
        let mut entry: Option<PendingEntry> = None;
        let mut field: Option<Field> = None;

        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(err) => return Err(self.xml_error(err)),
            };

            match event {
                Event::Start(start) => {
                    field = None;
                    match start.local_name().as_ref() {
                        b"item" => entry = Some(PendingEntry::default()),
                        name if entry.is_some() => {
                            field = match name {
                                b"date" => Some(Field::Date),
                                b"value" => Some(Field::Value),
                                b"baseCurrency" => Some(Field::Base),
                                b"targetCurrency" => Some(Field::Target),
                                _ => None,
                            };
                        }
                        _ => {}
                    }
                }
                Event::Text(text) => {
                    if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                        let text = match text.unescape() {
                            Ok(text) => text.into_owned(),
                            Err(err) => return Err(self.xml_error(err)),
                        };
                        current.set(f, text);
                    }
                }
                Event::CData(data) => {
                    if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                        current.set(f, String::from_utf8_lossy(&data.into_inner()).into_owned());
                    }
                }
                Event::End(end) => {
                    field = None;
                    if end.local_name().as_ref() == b"item" {
                        if let Some(done) = entry.take() {
                            return Ok(Some(done));
                        }
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl Iterator for FeedParser<'_> {
    type Item = Result<RawRateObservation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.next_entry() {
                Ok(Some(entry)) => match entry.into_observation() {
                    Ok(observation) => {
                        self.parsed += 1;
                        return Some(Ok(observation));
                    }
                    Err(reason) => {
                        self.skipped += 1;
                        warn!("Skipping malformed feed entry: {}", reason);
                    }
                },
                Ok(None) => {
                    self.finished = true;
                    debug!(
                        "Feed document done: {} entries parsed, {} skipped",
                        self.parsed, self.skipped
                    );
                    return None;
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Parse a whole document eagerly
pub fn parse_feed(document: &str) -> Result<Vec<RawRateObservation>> {
    FeedParser::new(document).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(date: &str, value: &str, base: &str, target: &str) -> String {
        format!(
            r#"<item rdf:about="http://www.ecb.europa.eu/stats/exchange/eurofxref/html/eurofxref-graph-{t}.en.html?date={d}">
<title xml:lang="en">{v} {t} = 1 {b} {d} ECB Reference rate</title>
<dc:date>{d}</dc:date>
<dc:language>en</dc:language>
<cb:statistics>
<cb:country>U2</cb:country>
<cb:institutionAbbrev>ECB</cb:institutionAbbrev>
<cb:exchangeRate>
<cb:value frequency="daily" decimals="4">{v}</cb:value>
<cb:baseCurrency unit_mult="0">{b}</cb:baseCurrency>
<cb:targetCurrency>{t}</cb:targetCurrency>
<cb:rateType>Reference rate</cb:rateType>
</cb:exchangeRate>
</cb:statistics>
</item>"#,
            d = date,
            v = value,
            b = base,
            t = target
        )
    }

    fn document(items: &[String]) -> String {
        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:cb="http://www.cbwiki.net/wiki/index.php/Specification_1.2/" xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel rdf:about="http://www.ecb.europa.eu/rss/fxref-usd.html">
<title>ECB | US dollar (USD) - Euro foreign exchange reference rates</title>
<dc:date>2025-11-21T14:15:00+01:00</dc:date>
<items><rdf:Seq><rdf:li rdf:resource="http://www.ecb.europa.eu/rss/1"/></rdf:Seq></items>
</channel>
{}
</rdf:RDF>"##,
            items.join("\n")
        )
    }

    #[test]
    fn test_parses_entries() {
        let doc = document(&[
            item("2025-11-21T14:15:00+01:00", "1.1520", "EUR", "USD"),
            item("2025-11-20T14:15:00+01:00", "1.1498", "EUR", "USD"),
        ]);

        let observations = parse_feed(&doc).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].pivot_currency, "EUR");
        assert_eq!(observations[0].target_currency, "USD");
        assert_eq!(observations[0].rate, 1.152);
        assert_eq!(
            crate::utils::format_timestamp(observations[0].date),
            "2025-11-21T14:15:00"
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let doc = document(&[
            item("2025-11-21T14:15:00+01:00", "", "EUR", "USD"),
            item("2025-11-21T14:15:00+01:00", "abc", "EUR", "USD"),
            item("2025-11-21T14:15:00+01:00", "NaN", "EUR", "USD"),
            item("", "1.1", "EUR", "USD"),
            item("2025-11-21T14:15:00+01:00", "1.1", "EUR", ""),
            item("2025-11-21T14:15:00+01:00", "0.8729", "EUR", "GBP"),
        ]);

        let mut parser = FeedParser::new(&doc);
        let observations: Vec<_> = parser.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].target_currency, "GBP");
        assert_eq!(parser.skipped(), 5);
        assert_eq!(parser.parsed(), 1);
    }

    #[test]
    fn test_entry_missing_rate_block_is_skipped() {
        let doc = document(&[
            "<item><dc:date>2025-11-21T14:15:00+01:00</dc:date></item>".to_string(),
            item("2025-11-21T14:15:00+01:00", "161.05", "EUR", "JPY"),
        ]);

        let observations = parse_feed(&doc).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].target_currency, "JPY");
    }

    #[test]
    fn test_channel_fields_are_ignored() {
        let observations = parse_feed(&document(&[])).unwrap();
        assert!(observations.is_empty());
        assert!(parse_feed("").unwrap().is_empty());
    }

    #[test]
    fn test_broken_document_is_an_error() {
        let doc = "<rdf:RDF><item><dc:date>2025-11-21</dc:date></rdf:RDF>";
        let result = parse_feed(doc);
        assert!(matches!(result, Err(FxError::FeedParse(_))));
    }

    #[test]
    fn test_parser_is_lazy() {
        let doc = document(&[
            item("2025-11-21T14:15:00+01:00", "1.1520", "EUR", "USD"),
            item("2025-11-20T14:15:00+01:00", "1.1498", "EUR", "USD"),
        ]);

        let mut parser = FeedParser::new(&doc);
        assert!(parser.next().is_some());
        assert_eq!(parser.parsed(), 1);
    }
}
