//! Splits a `scripts/*.shader` file into its individually-named shader
//! bodies, re-serializing each body's tokens into a normalized, re-quoted
//! verbatim text form.

use mapbundle_text::Tokenizer;

/// One named shader and its verbatim (re-normalized) body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    /// The shader's declared name, as written (not lowercased).
    pub name: String,
    /// The shader body, starting at `{` and ending at the matching `}`.
    pub text: String,
}

/// Result of splitting a shader script file into its shaders.
#[derive(Debug, Clone, Default)]
pub struct ExtractedShaders {
    /// Shaders found, in file order.
    pub shaders: Vec<Shader>,
    /// Non-fatal structural warnings.
    pub errors: Vec<String>,
}

fn needs_quoting(token: &str) -> bool {
    if token.contains([' ', '\n', '\t', '\r']) || token.contains("//") || token.contains("/*") || token.contains("*/") {
        return true;
    }
    let bytes = token.as_bytes();
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i] == b'#' && matches!(bytes[i + 1], b'0' | b'1') && bytes[i + 2].is_ascii_hexdigit() {
            return true;
        }
        i += 1;
    }
    false
}

/// Parse a full shader script file's text into its component shaders.
#[must_use]
pub fn extract_shaders(text: &str) -> ExtractedShaders {
    let mut result = ExtractedShaders::default();
    let mut parser = Tokenizer::new(text);

    loop {
        let mut prefix_tokens = 0usize;
        let mut name = String::new();
        let mut saw_open_brace = false;

        loop {
            let token = parser.parse_ext(true);
            if token.is_empty() {
                if prefix_tokens > 0 {
                    result.errors.push("shader file has extra tokens at end".to_string());
                }
                return result;
            }
            if token == "{" {
                saw_open_brace = true;
                break;
            }
            name = token;
            prefix_tokens += 1;
        }
        debug_assert!(saw_open_brace);

        if prefix_tokens == 0 {
            result.errors.push("shader with no name".to_string());
            continue;
        }
        if prefix_tokens > 1 {
            result.errors.push("shader with extra preceding tokens".to_string());
        }

        let mut buffer = String::from("{");
        let mut depth = 1i32;
        loop {
            let (token, has_newline) = parser.parse_ext_n(true);
            if token.is_empty() {
                result.errors.push("shader with no closing brace".to_string());
                return result;
            }
            buffer.push(if has_newline { '\n' } else { ' ' });
            if needs_quoting(&token) {
                buffer.push('"');
                buffer.push_str(&token);
                buffer.push('"');
            } else {
                buffer.push_str(&token);
            }
            if token == "{" {
                depth += 1;
            }
            if token == "}" {
                depth -= 1;
            }
            if depth == 0 {
                break;
            }
        }

        result.shaders.push(Shader { name, text: buffer });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_single_named_shader() {
        let text = "textures/a/b\n{\n\tsurfaceparm nomarks\n\t{\n\t\tmap textures/a/b.tga\n\t}\n}\n";
        let result = extract_shaders(text);
        assert!(result.errors.is_empty());
        assert_eq!(result.shaders.len(), 1);
        assert_eq!(result.shaders[0].name, "textures/a/b");
        assert!(result.shaders[0].text.starts_with('{'));
    }

    #[test]
    fn extracts_multiple_shaders() {
        let text = "a\n{\n}\nb\n{\n}\n";
        let result = extract_shaders(text);
        assert_eq!(result.shaders.len(), 2);
        assert_eq!(result.shaders[0].name, "a");
        assert_eq!(result.shaders[1].name, "b");
    }

    #[test]
    fn warns_on_extra_preceding_tokens() {
        let text = "a b\n{\n}\n";
        let result = extract_shaders(text);
        assert_eq!(result.shaders.len(), 1);
        assert_eq!(result.shaders[0].name, "b");
        assert!(result.errors.iter().any(|e| e.contains("extra preceding tokens")));
    }
}
