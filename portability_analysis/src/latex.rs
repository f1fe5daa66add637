use portability_results::summary::SummaryTable;

/// Escapes the characters TeX treats specially in text mode.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::from("NaN")
    } else {
        format!("{:.2}", v)
    }
}

/// Renders a summary as a booktabs `tabular`, statistics as rows, applications as
/// columns, two decimals.
pub fn summary_tabular(table: &SummaryTable) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "\\begin{{tabular}}{{l{}}}\n",
        "r".repeat(table.applications.len())
    ));
    s.push_str("\\toprule\n");
    s.push_str("{}");
    for application in &table.applications {
        s.push_str(&format!(" & {}", escape(application)));
    }
    s.push_str(" \\\\\n\\midrule\n");
    for (statistic, values) in table.statistics.iter().zip(&table.values) {
        s.push_str(&escape(statistic.name()));
        for &v in values {
            s.push_str(&format!(" & {}", format_value(v)));
        }
        s.push_str(" \\\\\n");
    }
    s.push_str("\\bottomrule\n\\end{tabular}\n");
    s
}
