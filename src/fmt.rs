/// Format a float as a pound amount with thousands separators: £1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let pence = format!("{:.2}", abs);
    let (int_part, dec_part) = pence.split_once('.').unwrap_or((pence.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && (abs * 100.0).round() != 0.0 {
        format!("-£{with_commas}.{dec_part}")
    } else {
        format!("£{with_commas}.{dec_part}")
    }
}

/// Replace every character except the last two with `*`.
pub fn mask(value: &str) -> String {
    let count = value.chars().count();
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i + 2 < count { '*' } else { c })
        .collect()
}
