use serde_json::Value;

/// Print just the key answer from the output.
///
/// A result with an allocation prints one `TICKER PCT` line per holding;
/// otherwise the first well-known field found is printed, falling back to
/// the first field of the result.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "sharpe_ratio",
        "annual_return",
        "output_path",
        "observations",
    ];

    if let Value::Object(map) = result_obj {
        if let Some(Value::Array(allocation)) = map.get("allocation") {
            return allocation
                .iter()
                .filter_map(|e| {
                    let ticker = e.get("ticker")?.as_str()?;
                    let pct = e.get("percentage")?.as_str()?;
                    Some(format!("{} {}", ticker, pct))
                })
                .collect();
        }

        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return vec![format_minimal(val)];
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return vec![format!("{}: {}", key, format_minimal(val))];
        }
    }

    if let Value::Array(items) = result_obj {
        return items
            .iter()
            .map(|item| match item.get("ticker") {
                Some(t) => format_minimal(t),
                None => format_minimal(item),
            })
            .collect();
    }

    vec![format_minimal(result_obj)]
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_allocation_lines() {
        let value = json!({
            "result": {
                "allocation": [
                    {"ticker": "KMI", "weight": 0.6, "percentage": "60.00%"},
                    {"ticker": "AIR.PA", "weight": 0.4, "percentage": "40.00%"}
                ]
            }
        });
        assert_eq!(minimal_lines(&value), vec!["KMI 60.00%", "AIR.PA 40.00%"]);
    }

    #[test]
    fn test_universe_lists_tickers() {
        let value = json!([{"ticker": "AU", "currency": "USD"}, {"ticker": "MB.MI", "currency": "EUR"}]);
        assert_eq!(minimal_lines(&value), vec!["AU", "MB.MI"]);
    }
}
