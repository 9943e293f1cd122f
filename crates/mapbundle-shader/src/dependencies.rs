//! Walks a single shader's body collecting image/video/sky references.
//!
//! Follows the keyword dispatch of the game's shader parser closely enough
//! to reach the same token positions it would, but never validates values
//! beyond recognizing keywords it must skip past correctly; anything it
//! doesn't recognize is logged as a warning and the rest of the line (or
//! stage) is discarded.

use std::collections::BTreeSet;

use mapbundle_text::Tokenizer;

const SKY_SUFFIXES: &[&str] = &["_rt.tga", "_bk.tga", "_lf.tga", "_ft.tga", "_up.tga", "_dn.tga"];

/// Image/video references discovered while walking a shader body, plus any
/// parse warnings encountered along the way.
#[derive(Debug, Clone, Default)]
pub struct ShaderDependencies {
    /// Warnings about malformed or unrecognized shader syntax.
    pub errors: BTreeSet<String>,
    /// Mandatory image references (e.g. `map`/`clampmap`/`animMap`).
    pub images: BTreeSet<String>,
    /// Optional image references (sky faces — missing ones aren't fatal).
    pub images_optional: BTreeSet<String>,
    /// Video references (`videoMap`).
    pub videos: BTreeSet<String>,
}

impl ShaderDependencies {
    /// Parse a single shader's body (starting at its opening `{`).
    #[must_use]
    pub fn extract(text: &str) -> Self {
        let mut deps = Self::default();
        let mut parser = Tokenizer::new(text);

        let token = parser.lparse_ext(true);
        if token != "{" {
            deps.errors.insert("shader missing opening brace".to_string());
            return deps;
        }

        loop {
            let token = parser.lparse_ext(true);
            if token.is_empty() {
                deps.errors.insert("unexpected end of shader without closing brace".to_string());
                break;
            }
            if token == "}" {
                break;
            }

            match token.as_str() {
                "{" => deps.parse_stage(&mut parser),
                _ if token.starts_with("qer") => parser.skip_rest_of_line(),
                "q3map_sun" => deps.skip_tokens(&mut parser, 6, None),
                "deformvertexes" => deps.parse_deform_vertexes(&mut parser),
                "tesssize" => parser.skip_rest_of_line(),
                "clamptime" => deps.skip_tokens(&mut parser, 1, None),
                _ if token.starts_with("q3map") => parser.skip_rest_of_line(),
                "surfaceparm" => deps.skip_tokens(&mut parser, 1, None),
                "nomipmaps" | "nopicmip" | "polygonoffset" | "entitymergable" => {}
                "fogparms" => {
                    deps.parse_vector(&mut parser);
                    deps.skip_tokens(&mut parser, 1, Some("missing parm for 'fogParms' keyword"));
                    parser.skip_rest_of_line();
                }
                "portal" => {}
                "skyparms" => deps.parse_sky_parms(&mut parser),
                "light" => deps.skip_tokens(&mut parser, 1, None),
                "cull" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        deps.errors.insert("missing cull parms".to_string());
                    } else if !matches!(
                        token.as_str(),
                        "none" | "twosided" | "disable" | "back" | "backside" | "backsided" | "bulge"
                    ) {
                        deps.errors.insert(format!("invalid cull parm: {token}"));
                    }
                }
                "sort" => deps.skip_tokens(&mut parser, 1, Some("missing sort parameter")),
                _ => {
                    deps.errors.insert(format!("unknown general parameter: {token}"));
                    parser.skip_rest_of_line();
                }
            }
        }

        deps
    }

    fn skip_tokens(&mut self, parser: &mut Tokenizer, count: usize, error_message: Option<&str>) {
        for _ in 0..count {
            if parser.lparse_ext(false).is_empty() {
                if let Some(msg) = error_message {
                    self.errors.insert(msg.to_string());
                }
                return;
            }
        }
    }

    fn parse_vector(&mut self, parser: &mut Tokenizer) {
        let token = parser.lparse_ext(false);
        if token != "(" {
            self.errors.insert("vector missing opening paren".to_string());
            return;
        }
        let mut last = String::new();
        for _ in 0..4 {
            last = parser.lparse_ext(false);
        }
        if last != ")" {
            self.errors.insert("vector missing closing paren".to_string());
        }
    }

    fn parse_waveform(&mut self, parser: &mut Tokenizer) {
        for _ in 0..5 {
            if parser.lparse_ext(false).is_empty() {
                self.errors.insert("missing waveform parm".to_string());
                return;
            }
        }
    }

    fn parse_sky_parms(&mut self, parser: &mut Tokenizer) {
        let token = parser.lparse_ext(false);
        if token.is_empty() {
            self.errors.insert("'skyParms' missing parameter".to_string());
            return;
        }
        if token != "-" {
            self.register_sky(&token);
        }
        let mut last = String::new();
        for _ in 0..2 {
            last = parser.lparse_ext(false);
            if last.is_empty() {
                self.errors.insert("'skyParms' missing parameter".to_string());
                return;
            }
        }
        if last != "-" {
            self.register_sky(&last);
        }
    }

    fn register_sky(&mut self, name: &str) {
        for suffix in SKY_SUFFIXES {
            self.images_optional.insert(format!("{name}{suffix}"));
        }
    }

    fn parse_deform_vertexes(&mut self, parser: &mut Tokenizer) {
        let token = parser.lparse_ext(false);
        match token.as_str() {
            "projectionshadow" | "autosprite" | "autosprite2" => {}
            _ if token.starts_with("text") => {}
            "bulge" => {
                for _ in 0..3 {
                    parser.lparse_ext(false);
                }
            }
            "wave" => {
                parser.lparse_ext(false);
                self.parse_waveform(parser);
            }
            "normal" => {
                for _ in 0..2 {
                    parser.lparse_ext(false);
                }
            }
            "move" => {
                for _ in 0..3 {
                    parser.lparse_ext(false);
                }
                self.parse_waveform(parser);
            }
            _ => {
                self.errors.insert(format!("unknown deformVertexes subtype: {token}"));
            }
        }
    }

    fn parse_stage(&mut self, parser: &mut Tokenizer) {
        loop {
            let token = parser.lparse_ext(true);
            if token.is_empty() {
                self.errors.insert("unexpected end of stage without closing brace".to_string());
                break;
            }
            if token == "}" {
                break;
            }

            match token.as_str() {
                "map" => {
                    let token = parser.parse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'map' keyword".to_string());
                    } else if !matches!(token.as_str(), "$whiteimage" | "$lightmap") {
                        self.images.insert(token);
                    }
                }
                "clampmap" => {
                    let token = parser.parse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'clampmap' keyword".to_string());
                    } else {
                        self.images.insert(token);
                    }
                }
                "animmap" => {
                    let token = parser.parse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'animMap' keyword".to_string());
                        continue;
                    }
                    for _ in 0..8 {
                        let token = parser.parse_ext(false);
                        if token.is_empty() {
                            break;
                        }
                        self.images.insert(token);
                    }
                }
                "videomap" => {
                    let token = parser.parse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'videoMap' keyword".to_string());
                    } else {
                        self.videos.insert(token);
                    }
                }
                "alphafunc" => self.skip_tokens(parser, 1, Some("missing parameter for 'alphaFunc' keyword")),
                "depthfunc" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'depthFunc' keyword".to_string());
                    } else if !matches!(token.as_str(), "lequal" | "disable" | "equal") {
                        self.errors.insert(format!("unknown depthFunc parameter: {token}"));
                    }
                }
                "detail" | "depthwrite" => {}
                "blendfunc" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing first parameter for 'blendFunc' keyword".to_string());
                        continue;
                    }
                    if matches!(token.as_str(), "add" | "filter" | "blend") {
                        continue;
                    }
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing second parameter for 'blendFunc' keyword".to_string());
                    }
                }
                "rgbgen" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'rgbGen' keyword".to_string());
                    } else if token == "wave" {
                        self.parse_waveform(parser);
                    } else if token == "const" {
                        self.parse_vector(parser);
                    } else if !matches!(
                        token.as_str(),
                        "identity"
                            | "identitylighting"
                            | "entity"
                            | "oneminusentity"
                            | "vertex"
                            | "exactvertex"
                            | "lightingdiffuse"
                            | "oneminusvertex"
                    ) {
                        self.errors.insert(format!("unknown rgbGen parameter: {token}"));
                    }
                }
                "alphagen" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'alphaGen' keyword".to_string());
                    } else if token == "wave" {
                        self.parse_waveform(parser);
                    } else if token == "const" {
                        parser.lparse_ext(false);
                    } else if token == "portal" {
                        if parser.lparse_ext(false).is_empty() {
                            self.errors.insert("missing range parameter for alphaGen portal".to_string());
                        }
                    } else if !matches!(
                        token.as_str(),
                        "identity" | "entity" | "oneminusentity" | "vertex" | "lightingspecular" | "oneminusvertex"
                    ) {
                        self.errors.insert(format!("unknown alphaGen parameter: {token}"));
                    }
                }
                "texgen" | "tcgen" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'texgen' keyword".to_string());
                    } else if matches!(token.as_str(), "environment" | "lightmap" | "texture") {
                        // no-op
                    } else if token == "vector" {
                        self.parse_vector(parser);
                        self.parse_vector(parser);
                    } else {
                        self.errors.insert(format!("unknown texgen parameter: {token}"));
                    }
                }
                "tcmod" => {
                    let token = parser.lparse_ext(false);
                    if token.is_empty() {
                        self.errors.insert("missing parameter for 'tcMod' keyword".to_string());
                        continue;
                    }
                    match token.as_str() {
                        "turb" => self.skip_tokens(parser, 4, Some("missing tcMod turb parameters")),
                        "scale" => self.skip_tokens(parser, 2, Some("missing tcMod scale parameters")),
                        "scroll" => self.skip_tokens(parser, 2, Some("missing tcMod scroll parameters")),
                        "stretch" => self.skip_tokens(parser, 5, Some("missing tcMod stretch parameters")),
                        "transform" => self.skip_tokens(parser, 6, Some("missing tcMod transform parameters")),
                        "rotate" => self.skip_tokens(parser, 1, Some("missing tcMod rotate parameter")),
                        "entitytranslate" => {}
                        _ => {
                            self.errors.insert(format!("unknown tcMod: {token}"));
                            parser.skip_rest_of_line();
                        }
                    }
                }
                _ => {
                    self.errors.insert(format!("unknown stage parameter: {token}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_stage_image_references() {
        let text = r#"{
            { map textures/a/b.tga }
        }"#;
        let deps = ShaderDependencies::extract(text);
        assert!(deps.errors.is_empty());
        assert!(deps.images.contains("textures/a/b.tga"));
    }

    #[test]
    fn skyparms_registers_six_optional_faces_per_name() {
        let text = "{ skyparms env/sky - - }";
        let deps = ShaderDependencies::extract(text);
        assert_eq!(deps.images_optional.len(), 6);
        assert!(deps.images_optional.contains("env/sky_rt.tga"));
    }

    #[test]
    fn animmap_registers_multiple_frames() {
        let text = "{ { animmap 5 a.tga b.tga c.tga } }";
        let deps = ShaderDependencies::extract(text);
        assert_eq!(deps.images.len(), 3);
    }

    #[test]
    fn whiteimage_and_lightmap_are_not_registered() {
        let text = "{ { map $lightmap } { map $whiteimage } }";
        let deps = ShaderDependencies::extract(text);
        assert!(deps.images.is_empty());
    }

    #[test]
    fn unknown_general_keyword_warns() {
        let text = "{ bogus_keyword foo }";
        let deps = ShaderDependencies::extract(text);
        assert!(deps.errors.iter().any(|e| e.contains("unknown general parameter")));
    }
}
