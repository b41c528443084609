use std::io::{BufRead, Write};

use anyhow::{anyhow, bail, Result};

/// Raw tabular data: the header plus every cell as text. Non-numeric columns
/// ride along untouched until the generalized output is written.
pub struct CsvData {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One quasi-identifier column with its observed numeric domain.
#[derive(Debug, Clone)]
pub struct QuasiIdentifier {
    pub name: String,
    pub index: usize,
    pub min: i64,
    pub max: i64,
}

impl QuasiIdentifier {
    pub fn range_size(&self) -> i64 {
        self.max - self.min + 1
    }
}

pub fn read_csv(filename: &str, delimiter: char) -> Result<CsvData> {
    let mut header = vec![];
    let mut rows = vec![];

    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        if header.is_empty() {
            header = line
                .split(delimiter)
                .map(|value| value.to_string())
                .collect();
            continue;
        }
        let row: Vec<String> = line
            .split(delimiter)
            .map(|value| value.to_string())
            .collect();
        if row.len() != header.len() {
            bail!(
                "row has {} fields but the header has {}",
                row.len(),
                header.len()
            );
        }
        rows.push(row);
    }
    Ok(CsvData { header, rows })
}

// Parse a cell as an integer; float cells are floored, since upstream data
// sources emit numeric columns in either form.
fn parse_value(value: &str) -> Result<i64> {
    if let Ok(parsed) = value.trim().parse::<i64>() {
        return Ok(parsed);
    }
    value
        .trim()
        .parse::<f64>()
        .map(|parsed| parsed.floor() as i64)
        .map_err(|_| anyhow!("Could not parse value: {}", value))
}

/// Locate the chosen quasi-identifier columns, parse their values and derive
/// each column's observed domain. Returns the domains and one parsed value
/// row per record.
pub fn derive_quasi_identifiers(
    data: &CsvData,
    columns: &[String],
) -> Result<(Vec<QuasiIdentifier>, Vec<Vec<i64>>)> {
    if columns.is_empty() {
        bail!("no quasi-identifier columns chosen");
    }
    if data.rows.is_empty() {
        bail!("dataset has no records");
    }
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        let index = data
            .header
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| anyhow!("column not found: {}", column))?;
        indices.push(index);
    }
    let mut values = Vec::with_capacity(data.rows.len());
    for row in &data.rows {
        let record = indices
            .iter()
            .map(|&index| parse_value(&row[index]))
            .collect::<Result<Vec<i64>>>()?;
        values.push(record);
    }
    let quasi_identifiers = indices
        .iter()
        .enumerate()
        .map(|(dim, &index)| {
            // rows are non-empty, checked above
            let min = values.iter().map(|record| record[dim]).min().unwrap();
            let max = values.iter().map(|record| record[dim]).max().unwrap();
            QuasiIdentifier {
                name: columns[dim].clone(),
                index,
                min,
                max,
            }
        })
        .collect();
    Ok((quasi_identifiers, values))
}

pub fn write_csv(filename: &str, data: &CsvData, delimiter: char) -> Result<()> {
    let mut file = std::fs::File::create(filename)?;
    let header_line = data.header.join(&delimiter.to_string());
    file.write_all(header_line.as_bytes())?;
    file.write_all("\n".as_bytes())?;
    for row in &data.rows {
        let line = row.join(&delimiter.to_string());
        file.write_all(line.as_bytes())?;
        file.write_all("\n".as_bytes())?;
    }
    Ok(())
}
