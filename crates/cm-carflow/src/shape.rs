//! Inner `data` cell shapes.
//!
//! Each outer row's `data` cell is itself a small CSV document, and providers
//! do not agree on its layout.  The cell is parsed once (comma first, then
//! semicolon when the first record is a single `;`-bearing token) and then
//! offered to each detector in [`InnerShape::ORDER`]; the first one that
//! applies produces the `(id, traffic_level)` pairs.
//!
//! | Shape        | Applies when                          | Pairs                                  |
//! |--------------|---------------------------------------|----------------------------------------|
//! | `BarePair`   | the cell has no records at all        | raw text split once on `,` (or `;`)    |
//! | `Labeled`    | header has `id` and `traffic_level`   | every later row, by header position    |
//! | `Positional` | any other header                      | header itself if 2 wide, then rows 0/1 |
//!
//! Rows are never assumed to share a shape; detection is per cell.

/// A raw `(id, traffic_level)` pair, not yet coerced.
pub type RawPair = (String, String);

/// A `data` cell split into records under its resolved delimiter.
#[derive(Debug)]
pub struct InnerTable<'a> {
    raw:       &'a str,
    delimiter: u8,
    rows:      Vec<Vec<String>>,
}

impl<'a> InnerTable<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let rows = read_rows(raw, b',');
        match rows.first() {
            Some(first) if first.len() == 1 && first[0].contains(';') => Self {
                raw,
                delimiter: b';',
                rows: read_rows(raw, b';'),
            },
            _ => Self { raw, delimiter: b',', rows },
        }
    }

    #[inline]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// The first record, if the cell produced any.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Records after the first.
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

fn read_rows(raw: &str, delimiter: u8) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(raw.as_bytes())
        .records()
        .filter_map(Result::ok)
        .map(|r| r.iter().map(str::to_owned).collect())
        .collect()
}

/// The recognised layouts of a `data` cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InnerShape {
    BarePair,
    Labeled,
    Positional,
}

impl InnerShape {
    /// Detectors in the order they are tried.
    pub const ORDER: [InnerShape; 3] = [InnerShape::BarePair, InnerShape::Labeled, InnerShape::Positional];

    /// Extract pairs if this shape applies to `table`; `None` means "not
    /// this shape", while `Some(vec![])` means "this shape, but no usable
    /// pairs".
    pub fn extract(self, table: &InnerTable<'_>) -> Option<Vec<RawPair>> {
        match self {
            InnerShape::BarePair => {
                if table.header().is_some() {
                    return None;
                }
                let text: String = table.raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();
                let sep = if text.contains(',') { ',' } else { ';' };
                let parts: Vec<&str> = text.split(sep).map(str::trim).collect();
                Some(match parts.as_slice() {
                    [id, level] => vec![(id.to_string(), level.to_string())],
                    _ => Vec::new(),
                })
            }
            InnerShape::Labeled => {
                let header: Vec<String> = table.header()?.iter().map(|h| h.trim().to_lowercase()).collect();
                let id_i = header.iter().position(|h| h == "id")?;
                let tl_i = header.iter().position(|h| h == "traffic_level")?;
                let need = id_i.max(tl_i);
                Some(
                    table
                        .body()
                        .iter()
                        .filter(|r| r.len() > need)
                        .map(|r| (r[id_i].clone(), r[tl_i].clone()))
                        .collect(),
                )
            }
            InnerShape::Positional => {
                let header = table.header()?;
                let mut pairs = Vec::with_capacity(table.body().len() + 1);
                if let [a, b] = header {
                    // A two-wide header is a data pair that was read as a header.
                    pairs.push((a.trim().to_owned(), b.trim().to_owned()));
                }
                pairs.extend(
                    table
                        .body()
                        .iter()
                        .filter(|r| r.len() >= 2)
                        .map(|r| (r[0].clone(), r[1].clone())),
                );
                Some(pairs)
            }
        }
    }
}

/// Run the detectors over one `data` cell.
pub fn resolve(raw: &str) -> (InnerShape, Vec<RawPair>) {
    let table = InnerTable::parse(raw);
    InnerShape::ORDER
        .into_iter()
        .find_map(|shape| shape.extract(&table).map(|pairs| (shape, pairs)))
        // Positional accepts any table with a header and BarePair any without.
        .unwrap_or((InnerShape::Positional, Vec::new()))
}
