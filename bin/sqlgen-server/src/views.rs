//! HTML views, embedded at compile time and rendered with minijinja.
//!
//! Template names end in `.html`, so minijinja escapes every interpolated
//! value.

use minijinja::{context, Environment};
use sqlgen_core::QueryOutcome;

/// The three pages the server renders.
#[derive(Debug)]
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("layout.html", include_str!("../templates/layout.html"))?;
        env.add_template("index.html", include_str!("../templates/index.html"))?;
        env.add_template("results.html", include_str!("../templates/results.html"))?;
        env.add_template("error.html", include_str!("../templates/error.html"))?;
        Ok(Self { env })
    }

    /// Empty prompt form.
    pub fn index(&self) -> Result<String, minijinja::Error> {
        self.env.get_template("index.html")?.render(context! {})
    }

    /// Prompt, executed SQL, and the result table.
    pub fn results(&self, outcome: &QueryOutcome) -> Result<String, minijinja::Error> {
        self.env.get_template("results.html")?.render(context! {
            prompt => outcome.prompt,
            sql_query => outcome.sql,
            columns => outcome.result.columns,
            rows => outcome.result.display_rows(),
        })
    }

    /// Failure message from whichever stage failed.
    pub fn error(&self, message: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template("error.html")?
            .render(context! { error => message })
    }
}

#[cfg(test)]
mod tests {
    use sqlgen_core::{CellValue, ResultSet};

    use super::*;

    #[test]
    fn index_has_prompt_field() {
        let html = Views::new().unwrap().index().unwrap();
        assert!(html.contains(r#"name="prompt""#));
        assert!(html.contains(r#"method="post""#));
    }

    #[test]
    fn results_show_sql_columns_and_rows() {
        let outcome = QueryOutcome {
            prompt: "orders over 50".into(),
            sql: "SELECT * FROM Orders WHERE Amount > 50".into(),
            result: ResultSet::new(
                vec!["OrderID".into(), "Amount".into()],
                vec![vec![CellValue::Int(1), CellValue::Float(99.5)]],
            ),
        };
        let html = Views::new().unwrap().results(&outcome).unwrap();
        assert!(html.contains("orders over 50"));
        assert!(html.contains("SELECT * FROM Orders WHERE Amount &gt; 50"));
        assert!(html.contains("<th>OrderID</th>"));
        assert!(html.contains("<td>99.5</td>"));
    }

    #[test]
    fn error_message_is_escaped() {
        let html = Views::new()
            .unwrap()
            .error("query execution failed: <script>")
            .unwrap();
        assert!(html.contains("query execution failed: &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
