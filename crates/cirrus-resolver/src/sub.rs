//! `Fn::Sub` placeholder scanning

use cirrus_core::{Result, TemplateError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Name inside `${...}`: a variable, parameter, resource or `Resource.Attribute`.
    Variable(String),
}

/// Split a substitution string into literal text and placeholders.
///
/// `${!Name}` is an escape and produces the literal text `${Name}`.
pub fn segments(input: &str, at: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        text.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            TemplateError::type_error(at, format!("unterminated placeholder in '{}'", input))
        })?;
        let body = &after[..end];

        if let Some(literal) = body.strip_prefix('!') {
            text.push_str("${");
            text.push_str(literal);
            text.push('}');
        } else {
            let name = body.trim();
            if name.is_empty() {
                return Err(TemplateError::type_error(
                    at,
                    format!("empty placeholder in '{}'", input),
                ));
            }
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Variable(name.to_string()));
        }
        rest = &after[end + 1..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("${ClusterName}-${Environment}", "x").unwrap(),
            vec![
                Segment::Variable("ClusterName".into()),
                Segment::Text("-".into()),
                Segment::Variable("Environment".into()),
            ]
        );
        assert_eq!(
            segments("arn:${AWS::Partition}:iam", "x").unwrap(),
            vec![
                Segment::Text("arn:".into()),
                Segment::Variable("AWS::Partition".into()),
                Segment::Text(":iam".into()),
            ]
        );
    }

    #[test]
    fn test_escape_is_literal() {
        assert_eq!(
            segments("echo ${!HOME} ${Name}", "x").unwrap(),
            vec![
                Segment::Text("echo ${HOME} ".into()),
                Segment::Variable("Name".into()),
            ]
        );
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(segments("plain", "x").unwrap(), vec![Segment::Text("plain".into())]);
        assert!(segments("", "x").unwrap().is_empty());
        assert_eq!(segments("cost: $5", "x").unwrap(), vec![Segment::Text("cost: $5".into())]);
    }

    #[test]
    fn test_malformed_placeholders() {
        let err = segments("${Open", "Outputs.A.Value").unwrap_err();
        assert_eq!(err.kind(), "TypeError");
        assert_eq!(err.path(), Some("Outputs.A.Value"));
        assert!(segments("${ }", "x").is_err());
    }
}
