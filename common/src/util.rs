/// Turns a series label into something usable inside a file name: lowercase,
/// with every run of characters outside `[a-z0-9_]` collapsed into one `-`.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut in_run = false;
    for c in label.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

/// Escapes text placed inside a double quoted gnuplot string. Underscores
/// must be double escaped or the enhanced terminal renders them as subscripts.
pub fn gnuplot_escape(text: &str) -> String {
    text.replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('_', r"\\\_")
}

/// Shortest round-trip form, switching to `1e-05` / `2e+06` style when the
/// decimal exponent is below -4 or at least 6.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_owned();
    }
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..6).contains(&exponent) {
        value.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// JSON that can be dropped into a `<script>` element as-is.
pub fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_runs() {
        assert_eq!(sanitize_label("throughput (MiB/s)"), "throughput-mib-s-");
        assert_eq!(sanitize_label("file_/dev/zero"), "file_-dev-zero");
        assert_eq!(sanitize_label("4096"), "4096");
        assert_eq!(sanitize_label("A  --  B"), "a-b");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for label in [
            "throughput (MiB/s)",
            "file_/dev/urandom",
            "--x--",
            "Größe über alles",
            "",
            "already-clean_label",
        ] {
            let once = sanitize_label(label);
            assert_eq!(sanitize_label(&once), once, "label {label:?}");
        }
    }

    #[test]
    fn gnuplot_escapes_underscores_and_quotes() {
        assert_eq!(gnuplot_escape("read_buffer_bytes"), r"read\\\_buffer\\\_bytes");
        assert_eq!(gnuplot_escape(r#"a "b""#), r#"a \"b\""#);
    }

    #[test]
    fn gnuplot_escapes_backslashes_first() {
        assert_eq!(gnuplot_escape(r"MiB\"), r"MiB\\");
        assert_eq!(gnuplot_escape(r#"a\"b"#), r#"a\\\"b"#);
        let script = format!("set ylabel \"{}\"", gnuplot_escape(r"rate\"));
        assert!(script.ends_with(r#"\\""#));
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(40.0), "40");
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(2.0000001), "2.0000001");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(0.000012345), "1.2345e-05");
        assert_eq!(format_float(100000.0), "100000");
        assert_eq!(format_float(1234567.0), "1.234567e+06");
        assert_eq!(format_float(1e300), "1e+300");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
    }

    #[test]
    fn html_escape_special_chars() {
        assert_eq!(html_escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn script_json_breaks_closing_tags() {
        let json = script_json("</script>").unwrap();
        assert_eq!(json, r#""<\/script>""#);
    }
}
