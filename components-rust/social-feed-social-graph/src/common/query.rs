/// Parsed search query: free terms plus `field:value` filters.
///
/// Values may be quoted to include whitespace, e.g. `username:"ali"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub terms: Vec<String>,
    pub field_filters: Vec<(String, String)>,
}

impl Query {
    pub fn new(query: &str) -> Self {
        let mut terms = Vec::new();
        let mut field_filters = Vec::new();

        for token in tokenize(query) {
            match token.split_once(':') {
                Some((field, value)) if !field.is_empty() && !value.is_empty() => {
                    field_filters.push((field.to_lowercase(), unquote(value).to_string()));
                }
                _ => {
                    let term = unquote(&token);
                    if !term.is_empty() {
                        terms.push(term.to_string());
                    }
                }
            }
        }

        Query {
            terms,
            field_filters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.field_filters.is_empty()
    }
}

fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in query.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

pub fn text_matches(text: &str, query: &str) -> bool {
    text.to_lowercase().contains(&query.to_lowercase())
}

pub fn text_exact_matches(text: &str, query: &str) -> bool {
    text.eq_ignore_ascii_case(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_terms_and_filters() {
        let q = Query::new(r#"ali username:"al ice" email:test.com"#);
        assert_eq!(q.terms, vec!["ali".to_string()]);
        assert_eq!(
            q.field_filters,
            vec![
                ("username".to_string(), "al ice".to_string()),
                ("email".to_string(), "test.com".to_string())
            ]
        );
        assert!(Query::new("   ").is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(text_matches("Alice_01", "ice"));
        assert!(text_exact_matches("Alice", "alice"));
    }
}
