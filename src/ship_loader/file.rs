//! Line-oriented ship definition files: one ship per line, TAB-delimited
//! columns in schema order, `#` starts a trailing comment, blank lines and
//! comment-only lines are skipped.

use super::schema::{apply_field, is_na, synthetic_resistance_path, ShipFieldBuilder, SCHEMA};
use crate::error::{SimError, SimResult};
use crate::model::ShipParameters;

/// Strip a `#`-prefixed trailing comment, if any.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parse one line into `ShipParameters`.
///
/// `resistance_only` relaxes the `Path` column: if it is `"na"`, a synthetic
/// two-point path is substituted (spec.md §4.B — resistance studies don't
/// need real routing).
pub fn parse_line(line: &str, resistance_only: bool) -> SimResult<ShipParameters> {
    let content = strip_comment(line).trim();
    let columns: Vec<&str> = content.split('\t').map(str::trim).collect();

    if columns.len() != SCHEMA.len() {
        return Err(SimError::Domain(format!(
            "expected {} columns, got {}",
            SCHEMA.len(),
            columns.len()
        )));
    }

    let mut builder = ShipFieldBuilder::default();
    for (field, raw) in SCHEMA.iter().zip(columns.iter()) {
        if field.name == "Path" && resistance_only && is_na(raw) {
            builder.path = Some(synthetic_resistance_path());
            continue;
        }
        if field.is_optional && is_na(raw) {
            continue;
        }
        apply_field(&mut builder, field.name, raw)?;
    }
    builder.build()
}

/// Parse an entire ship definition file, skipping blank/comment-only lines.
pub fn parse_file(contents: &str, resistance_only: bool) -> SimResult<Vec<ShipParameters>> {
    contents
        .lines()
        .filter(|line| !strip_comment(line).trim().is_empty())
        .map(|line| parse_line(line, resistance_only))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_line() -> String {
        let cols = vec![
            "ship-1",           // ID
            "0,0;1,1",          // Path
            "12",               // MaxSpeed
            "100",              // WaterlineLength
            "98",               // LengthBetweenPerpendiculars
            "20",               // Beam
            "6",                // DraftAtForward
            "6.2",              // DraftAtAft
            "na",               // VolumetricDisplacement
            "na",               // WettedHullSurface
            "500",              // ShipAndCargoAreaAboveWaterline
            "2",                // BulbousBowTransverseAreaCenterHeight
            "10",               // BulbousBowTransverseArea
            "5",                // ImmersedTransomArea
            "na",               // HalfWaterlineEntranceAngle
            "0.00015",          // SurfaceRoughness
            "0.5",              // LongitudinalBuoyancyCenter
            "normal",           // SternShapeParam
            "na",               // MidshipSectionCoef
            "na",               // WaterplaneAreaCoef
            "na",               // PrismaticCoef
            "na",               // BlockCoef
            "HFO",              // FuelType
            "50000",            // TankSize
            "90",               // TankInitialCapacityPercentage
            "10",               // TankDepthOfDischarge
            "1",                // EnginesCountPerPropeller
            "1000,2000,3000,4000", // EngineOperationalPowerSettings
            "500,100,0.9;1000,200,0.92", // EngineTierIIPropertiesPoints
            "na",               // EngineTierIIIPropertiesPoints
            "0.98",             // GearboxRatio
            "0.97",             // GearboxEfficiency
            "0.99",             // ShaftEfficiency
            "1",                // PropellerCount
            "5",                // PropellerDiameter
            "4",                // PropellerPitch
            "4",                // PropellerBladesCount
            "0.6",              // PropellerExpandedAreaRatio
            "na",               // StopIfNoEnergy
            "na",               // MaxRudderAngle
            "20000",            // VesselWeight
            "5000",             // CargoWeight
            "na",               // AppendagesWettedSurfaces
        ];
        cols.join("\t")
    }

    #[test]
    fn parses_a_well_formed_line() {
        let params = parse_line(&sample_line(), false).unwrap();
        assert_eq!(params.id, "ship-1");
        assert_eq!(params.path.len(), 2);
        assert!(params.volumetric_displacement_m3.is_none());
        assert_eq!(params.engine_tier_ii_properties_points.len(), 2);
    }

    #[test]
    fn rejects_wrong_column_count() {
        assert!(parse_line("too\tfew\tcolumns", false).is_err());
    }

    #[test]
    fn comment_and_blank_lines_are_skipped_in_files() {
        let body = format!("# a comment\n\n{}\n", sample_line());
        let ships = parse_file(&body, false).unwrap();
        assert_eq!(ships.len(), 1);
    }

    #[test]
    fn resistance_only_synthesizes_path_when_na() {
        let mut cols: Vec<&str> = sample_line().split('\t').map(|_| "").collect();
        let raw = sample_line();
        cols = raw.split('\t').collect();
        cols[1] = "na";
        let line = cols.join("\t");
        let params = parse_line(&line, true).unwrap();
        assert_eq!(params.path.len(), 2);
    }
}
