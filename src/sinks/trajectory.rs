//! Append-only trajectory sink: opened lazily on first write, flushed
//! after every row. Durability over throughput, per spec.md §4.A.

use crate::error::SimResult;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The two row schemas a trajectory sink can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectorySchema {
    ResistanceStudy,
    TimeStepped,
}

impl TrajectorySchema {
    pub fn header(self) -> &'static str {
        match self {
            Self::ResistanceStudy => {
                "ShipNo,Speed_knots,FroudeNumber,Fr_i,AirResistance_kN,\
BulbousBowResistance_kN,ImmersedTransomPressureResistance_kN,\
AppendageResistance_N,WaveResistance_kN,FrictionalResistance_kN,\
ModelCorrelationResistance_kN,TotalResistance_kN,ResistanceCoefficient"
            }
            Self::TimeStepped => {
                "TStep_s,ShipNo,WaterSalinity_ppt,WaveHeight_m,WaveFrequency_hz,\
WaveLength_m,NorthwardWindSpeed_mps,EastwardWindSpeed_mps,TotalShipThrust_N,\
TotalShipResistance_N,maxAcceleration_mps2,TravelledDistance_m,\
Acceleration_mps2,Speed_knots,CumEnergyConsumption_KWH,\
MainEnergySourceCapacityState_percent,Position(long;lat),Course_deg"
            }
        }
    }
}

/// Lazily-opened, line-flushed CSV trajectory writer.
#[derive(Debug)]
pub struct TrajectorySink {
    path: PathBuf,
    schema: TrajectorySchema,
    writer: Option<BufWriter<File>>,
}

impl TrajectorySink {
    pub fn new(path: PathBuf, schema: TrajectorySchema) -> Self {
        Self {
            path,
            schema,
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and write the header, if not already open. Called at
    /// `Simulator::initialize` so the header is present even if the run
    /// never actually writes a row.
    pub fn open(&mut self) -> SimResult<()> {
        self.ensure_open()?;
        Ok(())
    }

    fn ensure_open(&mut self) -> SimResult<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{}", self.schema.header())?;
            writer.flush()?;
            self.writer = Some(writer);
        }
        Ok(self.writer.as_mut().expect("just opened"))
    }

    /// Append one already-formatted row, flushing immediately. A write
    /// failure leaves no partial line: the header is written once up
    /// front, and each row write is followed by an explicit flush.
    pub fn write_line(&mut self, line: &str) -> SimResult<()> {
        let writer = self.ensure_open()?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    /// Write a raw blank-line separator (used between resistance-study
    /// phases), without touching the header.
    pub fn write_blank_line(&mut self) -> SimResult<()> {
        let writer = self.ensure_open()?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Truncate the file and drop the open handle so the next write
    /// reopens it (and rewrites the header).
    pub fn clear(&mut self) -> SimResult<()> {
        self.writer = None;
        let _ = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(())
    }

    pub fn close(&mut self) -> SimResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_header_on_first_line_and_flushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shipTrajectory_1.csv");
        let mut sink = TrajectorySink::new(path.clone(), TrajectorySchema::TimeStepped);
        sink.write_line("1.0,ship-1,35,0,0,0,0,0,0,0,0.1,10,0.1,12,0.5,99.0,\"0,0\",0").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("TStep_s"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn clear_truncates_and_reopen_rewrites_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shipTrajectory_1.csv");
        let mut sink = TrajectorySink::new(path.clone(), TrajectorySchema::ResistanceStudy);
        sink.write_line("ship-1,0,0,0,0,0,0,0,0,0,0,0,0").unwrap();
        sink.clear().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.is_empty());
        sink.write_line("ship-1,1,0,0,0,0,0,0,0,0,0,0,0").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn blank_line_separates_resistance_phases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.csv");
        let mut sink = TrajectorySink::new(path.clone(), TrajectorySchema::ResistanceStudy);
        sink.write_line("a").unwrap();
        sink.write_blank_line().unwrap();
        sink.write_blank_line().unwrap();
        sink.write_line("b").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "");
    }
}
