//! Small in-memory datasets shared by the unit tests.

use serde_json::{Value, json};

use crate::grid::{GridFile, MetricGrid};
use crate::records::RecordStore;

pub const LON: [f64; 4] = [72.0, 75.0, 76.0, 80.0];
pub const LAT: [f64; 4] = [10.0, 12.0, 15.0, 30.0];

/// Two yearly steps (2020, 2021). Cell value is `(t + 1) * 100 + 10 * lon_index`,
/// so Karnataka and Punjab average 165 overall and Tamil Nadu 175.
pub fn grid() -> MetricGrid {
    let mut values = Vec::new();
    for t in 0..2 {
        for _lat in 0..4 {
            for lon in 0..4 {
                values.push(Some(((t + 1) * 100 + 10 * lon) as f64));
            }
        }
    }
    MetricGrid::from_file(GridFile {
        source: "RF25_ind2022_rfp25.nc".into(),
        dataset: None,
        variable: Some("RAINFALL".into()),
        unit: Some("mm".into()),
        period: Some("2020-2021".into()),
        lon: LON.to_vec(),
        lat: LAT.to_vec(),
        time: vec![2020.0, 2021.0],
        years: vec![],
        shape: vec![2, 4, 4],
        values,
    })
    .expect("fixture grid is well formed")
}

const COLUMNS: [&str; 13] = [
    "State",
    "District",
    "Year",
    "Rice_area",
    "Rice_production",
    "Rice_yield",
    "Wheat_area",
    "Wheat_production",
    "Sugarcane_area",
    "Sugarcane_production",
    "Banana_production",
    "Coconut_Nuts_production",
    "Cotton_Bales_production",
];

fn row(state: &str, district: &str, year: i32, cells: [Value; 10]) -> Vec<Value> {
    let mut r = vec![json!(state), json!(district), json!(year)];
    r.extend(cells);
    r
}

/// Punjab: rice and wheat (wheat grows 800 -> 1200 -> 1600), no banana.
/// Tamil Nadu: sugarcane totals 1000, banana recorded as 0.
/// Kerala: sugarcane and banana both recorded as 0.
pub fn records() -> RecordStore {
    let n = Value::Null;
    let rows = vec![
        row("Punjab", "Ludhiana", 2019, [
            json!(100), json!(400), json!(4.0), json!(200), json!(800),
            n.clone(), n.clone(), n.clone(), n.clone(), json!(50),
        ]),
        row("Punjab", "Ludhiana", 2020, [
            json!(100), json!(500), json!(5.0), json!(200), json!(900),
            n.clone(), n.clone(), n.clone(), n.clone(), json!(60),
        ]),
        row("Punjab", "Amritsar", 2020, [
            json!(50), json!(150), json!(3.0), json!(100), json!(300),
            n.clone(), n.clone(), n.clone(), n.clone(), n.clone(),
        ]),
        row("Punjab", "Amritsar", 2021, [
            json!(60), json!(250), json!(4.2), json!(400), json!(1600),
            n.clone(), n.clone(), n.clone(), n.clone(), n.clone(),
        ]),
        row("Tamil Nadu", "Thanjavur", 2019, [
            json!(300), json!(900), json!(3.0), n.clone(), n.clone(),
            json!(10), json!(600), json!(0), json!(5000), n.clone(),
        ]),
        row("Tamil Nadu", "Madurai", 2020, [
            json!(100), json!(200), json!(2.0), n.clone(), n.clone(),
            json!(5), json!(400), json!(0), json!(3000), n.clone(),
        ]),
        row("Kerala", "Kozhikode", 2021, [
            json!(20), json!(40), json!(2.0), n.clone(), n.clone(),
            json!(0), json!(0), json!(0), json!(9000), n.clone(),
        ]),
    ];
    let columns: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    RecordStore::from_table("crop_production.html".into(), &columns, &rows)
        .expect("fixture table is well formed")
}
