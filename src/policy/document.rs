//! Policy document parsing and serialization.
//!
//! Documents use the conventional comma-separated policy file format, one
//! rule per line with the policy type first:
//!
//! ```text
//! p, alice, data1, read
//! g, alice, data2_admin
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. A value containing a
//! comma or a double quote is wrapped in double quotes, with `""` escaping a
//! literal quote.

use super::{PolicyModel, PolicyRecord, Section};
use crate::{Error, Result};

use std::path::Path;

/// A set of rules read from or written to a policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    model: PolicyModel,
}

impl PolicyDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing model.
    pub fn from_model(model: PolicyModel) -> Self {
        Self { model }
    }

    /// Parse a document from text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut model = PolicyModel::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut values = split_line(line).map_err(|message| Error::parse_at(message, line_no))?;
            let policy_type = values.remove(0);
            let section = Section::from_policy_type(&policy_type)
                .map_err(|e| Error::parse_at(e.to_string(), line_no))?;
            PolicyRecord::from_rule(policy_type.as_str(), &values)
                .map_err(|e| Error::parse_at(e.to_string(), line_no))?;

            model.add_policy(section, policy_type, values);
        }

        Ok(Self { model })
    }

    /// Load a document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Render the document in policy file format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (_, policy_type, rule) in self.model.rules() {
            let line = std::iter::once(policy_type)
                .chain(rule.iter().map(String::as_str))
                .map(quote_value)
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write the document to a file.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    /// The rules in this document.
    pub fn model(&self) -> &PolicyModel {
        &self.model
    }

    /// Take the rules out of this document.
    pub fn into_model(self) -> PolicyModel {
        self.model
    }
}

fn split_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                quoted = true;
            }
            ',' if !quoted => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if quoted {
        return Err("unterminated quoted value".to_string());
    }
    values.push(current.trim().to_string());

    if values[0].is_empty() {
        return Err("missing policy type".to_string());
    }
    Ok(values)
}

fn quote_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.trim() != value {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RBAC_POLICY: &str = "\
p, alice, data1, read
p, bob, data2, write
p, data2_admin, data2, read
p, data2_admin, data2, write

# role assignments
g, alice, data2_admin
";

    #[test]
    fn test_parse_document() {
        let doc = PolicyDocument::parse(RBAC_POLICY).unwrap();
        let model = doc.model();
        assert_eq!(model.len(), 5);
        assert_eq!(model.policy(Section::Policy, "p").len(), 4);
        assert_eq!(
            model.policy(Section::Grouping, "g"),
            &[vec!["alice".to_string(), "data2_admin".to_string()]]
        );
    }

    #[test]
    fn test_quoted_values() {
        let doc = PolicyDocument::parse("p, \"alice, jr\", \"say \"\"hi\"\"\", read").unwrap();
        let rules = doc.model().policy(Section::Policy, "p");
        assert_eq!(rules[0], vec!["alice, jr", "say \"hi\"", "read"]);

        let text = doc.to_text();
        let reparsed = PolicyDocument::parse(&text).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_to_text() {
        let doc = PolicyDocument::parse(RBAC_POLICY).unwrap();
        let text = doc.to_text();
        assert!(text.contains("p, alice, data1, read\n"));
        assert!(text.contains("g, alice, data2_admin\n"));
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = PolicyDocument::parse("p, alice\nx, bob").unwrap_err();
        assert!(matches!(err, Error::Parse { line: Some(2), .. }));

        let err = PolicyDocument::parse("p, a, b, c, d, e, f, g").unwrap_err();
        assert!(matches!(err, Error::Parse { line: Some(1), .. }));

        let err = PolicyDocument::parse("p, alice, , read").unwrap_err();
        assert!(matches!(err, Error::Parse { line: Some(1), .. }));

        let err = PolicyDocument::parse("p, \"alice").unwrap_err();
        assert!(matches!(err, Error::Parse { line: Some(1), .. }));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.csv");

        let doc = PolicyDocument::parse(RBAC_POLICY).unwrap();
        doc.write_file(&path).unwrap();
        let loaded = PolicyDocument::from_file(&path).unwrap();
        assert_eq!(loaded, doc);
    }
}
