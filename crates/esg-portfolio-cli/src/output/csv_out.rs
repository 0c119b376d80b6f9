use serde_json::{Map, Value};
use std::io::{self, Write};

/// Record lists written as a whole CSV table when a result carries one,
/// in order of preference.
const SERIES_KEYS: [&str; 3] = ["performance", "allocation", "conversions"];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    write_csv(&mut wtr, value);
    let _ = wtr.flush();
}

fn write_csv<W: Write>(wtr: &mut csv::Writer<W>, value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => match primary_series(result) {
                Some(records) => write_array_csv(wtr, records),
                None => write_fields(wtr, result),
            },
            _ => write_fields(wtr, map),
        },
        Value::Array(arr) => write_array_csv(wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }
}

fn primary_series(result: &Map<String, Value>) -> Option<&[Value]> {
    SERIES_KEYS.iter().find_map(|key| match result.get(*key) {
        Some(Value::Array(arr)) if !arr.is_empty() => Some(arr.as_slice()),
        _ => None,
    })
}

fn write_fields<W: Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value);
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_performance_series_preferred() {
        let value = json!({
            "result": {
                "weights": [1.0],
                "performance": [
                    {"date": "2024-01-02", "value": 1.01},
                    {"date": "2024-01-03", "value": 1.02}
                ]
            }
        });
        assert_eq!(render(&value), "date,value\n2024-01-02,1.01\n2024-01-03,1.02\n");
    }

    #[test]
    fn test_field_value_fallback() {
        let value = json!({"result": {"assets": 3}});
        assert_eq!(render(&value), "field,value\nassets,3\n");
    }
}
