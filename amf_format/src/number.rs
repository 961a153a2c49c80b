/// Largest number of decimals written in fixed notation. Smaller magnitudes
/// switch to exponent notation instead of expanding into long runs of zeros.
const MAX_DECIMALS: usize = 17;

/// Formats a coordinate with `significant` significant digits. Values are
/// written in fixed notation unless that would take more than
/// [`MAX_DECIMALS`] decimals, then as `<mantissa>e<exponent>`. Trailing zeros
/// are trimmed and negative zero is written as `0`, so the same value always
/// produces the same text.
pub fn format_number(value: f64, significant: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return if value.is_finite() {
            "0".to_owned()
        } else {
            value.to_string()
        };
    }

    let significant = significant.max(1) as i32;
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = significant - 1 - magnitude;

    if decimals > MAX_DECIMALS as i32 {
        let precision = (significant - 1) as usize;
        let out = format!("{value:.precision$e}");
        return match out.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{exponent}", trim_zeros(mantissa)),
            None => out,
        };
    }

    let decimals = decimals.max(0) as usize;
    let mut out = trim_zeros(&format!("{value:.decimals$}")).to_owned();
    if out == "-0" {
        out.remove(0);
    }

    out
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
