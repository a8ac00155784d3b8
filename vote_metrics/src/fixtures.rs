//! Small on-disk datasets in the partitioned layout, for tests.
//!
//! Enabled with the `fixtures` feature outside of this crate's own tests.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use datafusion::arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::error::Result;
use datafusion::parquet::arrow::ArrowWriter;

/// One precomputed metrics row, keys already in their stored form.
#[derive(Debug, Clone, Copy)]
pub struct SampleRow {
    pub turno: &'static str,
    pub uf: &'static str,
    pub zone_group: &'static str,
    pub zone_code: &'static str,
    pub section_code: &'static str,
    pub total_votos: i64,
    pub total_secoes: i64,
    pub tempo_voto_medio: f64,
    pub tempo_biometria_medio: Option<f64>,
}

impl SampleRow {
    /// The aggregate over a whole state (or the country with `uf` = `ALL`).
    pub const fn state_total(
        turno: &'static str,
        uf: &'static str,
        total_votos: i64,
        total_secoes: i64,
        tempo_voto_medio: f64,
        tempo_biometria_medio: Option<f64>,
    ) -> SampleRow {
        SampleRow {
            turno,
            uf,
            zone_group: "ALL",
            zone_code: "ALL",
            section_code: "ALL",
            total_votos,
            total_secoes,
            tempo_voto_medio,
            tempo_biometria_medio,
        }
    }
}

// Partition columns live in the directory names, not in the files.
fn file_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("zone_code", DataType::Utf8, false),
        Field::new("section_code", DataType::Utf8, false),
        Field::new("total_votos", DataType::Int64, true),
        Field::new("total_secoes", DataType::Int64, true),
        Field::new("tempo_voto_medio", DataType::Float64, true),
        Field::new("tempo_biometria_medio", DataType::Float64, true),
    ]))
}

/// Writes `rows` under `root`, one Parquet file per
/// `turno=/uf=/zone_group=` directory.
pub fn write_dataset(root: &Path, rows: &[SampleRow]) -> Result<()> {
    let mut partitions: BTreeMap<(&str, &str, &str), Vec<&SampleRow>> = BTreeMap::new();
    for r in rows {
        partitions
            .entry((r.turno, r.uf, r.zone_group))
            .or_default()
            .push(r);
    }

    let schema = file_schema();
    for ((turno, uf, zone_group), rows) in partitions {
        let dir = root
            .join(format!("turno={}", turno))
            .join(format!("uf={}", uf))
            .join(format!("zone_group={}", zone_group));
        fs::create_dir_all(&dir)?;
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.zone_code))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.section_code))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.total_votos))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.total_secoes))),
            Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.tempo_voto_medio),
            )),
            Arc::new(Float64Array::from_iter(
                rows.iter().map(|r| r.tempo_biometria_medio),
            )),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        let file = File::create(dir.join("data_0.parquet"))?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;
        writer.write(&batch)?;
        writer.close()?;
    }
    Ok(())
}
