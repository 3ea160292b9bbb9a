//! Directive parser: recursive-descent, single pass over the token stream.
//!
//! Grounded on `renderer::backend::gl::shader::preprocessor`'s shape (an
//! `Error`/`*ErrorKind` split, `warn!`-logged recoverable failures, a
//! single place that resynchronizes after a bad directive) but built
//! against our own token stream instead of `lazy_static!` regexes, since
//! this DSL is parsed after lexing rather than matched line-by-line.

use crate::struct_layout::Std140LayoutBuilder;
use crate::token::{Token, TokenKind};
use crate::types::{
    DescriptorType, GlslType, Rate, SetBindingLayout, Stage, StructDescription, TemplateSlice,
    VertexAttribute,
};

/// Fatal parse failure: dispatch on an unrecognized directive keyword.
/// The whole shader is abandoned, not just the directive.
#[derive(Debug)]
pub struct AmbiguousDirectiveError {
    pub source_offset: usize,
}

impl std::fmt::Display for AmbiguousDirectiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unrecognized directive keyword after `{{{{` at byte {}",
            self.source_offset
        )
    }
}

impl std::error::Error for AmbiguousDirectiveError {}

/// Output of a full directive-parser pass over one shader's token stream.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub slices: Vec<TemplateSlice>,
    pub vertex_attributes: Vec<VertexAttribute>,
    pub descriptor_bindings: Vec<SetBindingLayout>,
}

/// Parse the directive stream for one shader. `stage` gates whether the
/// extended `LOCATION` form is semantically legal.
pub fn parse(tokens: &[Token], stage: Stage) -> Result<ParseOutput, AmbiguousDirectiveError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        stage,
        out: ParseOutput::default(),
    };
    parser.run()?;
    Ok(parser.out)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    stage: Stage,
    out: ParseOutput,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<(), AmbiguousDirectiveError> {
        while self.pos < self.tokens.len() {
            if self.tokens[self.pos].kind != TokenKind::DoubleLBrace {
                self.pos += 1;
                continue;
            }
            let current_start = self.tokens[self.pos].source_offset;
            self.pos += 1;

            match self.peek_kind() {
                Some(TokenKind::KwVersion) => self.parse_version(current_start),
                Some(TokenKind::KwLocation) => self.parse_location(current_start),
                Some(TokenKind::KwSetBinding) => self.parse_set_binding(current_start),
                Some(TokenKind::KwPushConstant) => self.parse_push_constant(current_start),
                _ => {
                    return Err(AmbiguousDirectiveError {
                        source_offset: current_start,
                    });
                }
            }
        }
        Ok(())
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    /// Consume one identifier-class token whose text is all ASCII digits.
    fn expect_uint(&mut self) -> Option<u32> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Text(s),
                ..
            }) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                let n = s.parse().ok();
                self.pos += 1;
                n
            }
            _ => None,
        }
    }

    /// Consume one identifier-class token carrying free text (not a keyword).
    fn expect_identifier(&mut self) -> Option<String> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Text(s),
                ..
            }) => {
                let s = s.clone();
                self.pos += 1;
                Some(s)
            }
            _ => None,
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Resynchronize: advance to and consume the next `}}`, or to end of
    /// stream if none remains. Centralizes directive-syntax-error recovery.
    fn resync(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind != TokenKind::DoubleRBrace
        {
            self.pos += 1;
        }
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn syntax_error(&mut self, offset: usize, message: &str) {
        log::warn!("directive syntax error at byte {}: {}", offset, message);
        self.resync();
    }

    fn semantic_error(&self, offset: usize, message: &str) {
        log::warn!("semantic error at byte {}: {}", offset, message);
    }

    // ---- VERSION -------------------------------------------------------

    fn parse_version(&mut self, current_start: usize) {
        self.pos += 1; // consume VERSION
        match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::DoubleRBrace => {
                let end = t.source_offset + 2;
                self.pos += 1;
                self.out.slices.push(TemplateSlice {
                    start: current_start,
                    end,
                    vulkan_text: "450\n".to_owned(),
                    opengl_text: "410 core\n".to_owned(),
                });
            }
            _ => self.syntax_error(current_start, "malformed VERSION directive, expected `}}`"),
        }
    }

    // ---- LOCATION --------------------------------------------------------

    fn parse_location(&mut self, current_start: usize) {
        self.pos += 1; // consume LOCATION
        let location = match self.expect_uint() {
            Some(n) => n,
            None => {
                self.syntax_error(current_start, "expected a location number after LOCATION");
                return;
            }
        };

        match self.peek_kind() {
            Some(TokenKind::DoubleRBrace) => {
                let end = self.tokens[self.pos].source_offset + 2;
                self.pos += 1;
                self.push_location_slice(current_start, end, location);
            }
            Some(TokenKind::KwBinding) => {
                self.pos += 1;
                let binding = match self.expect_uint() {
                    Some(n) => n,
                    None => {
                        self.syntax_error(current_start, "expected a binding number after BINDING");
                        return;
                    }
                };
                let rate = match self.peek_kind() {
                    Some(TokenKind::KwRateVertex) => {
                        self.pos += 1;
                        Rate::Vertex
                    }
                    Some(TokenKind::KwRateInstance) => {
                        self.pos += 1;
                        Rate::Instance
                    }
                    _ => {
                        self.syntax_error(current_start, "expected RATE_VERTEX or RATE_INSTANCE");
                        return;
                    }
                };
                if !self.expect(&TokenKind::KwOffset) {
                    self.syntax_error(current_start, "expected OFFSET");
                    return;
                }
                let (offset, is_tightly_packed) = match self.peek_kind() {
                    Some(TokenKind::KwTightlyPacked) => {
                        self.pos += 1;
                        (None, true)
                    }
                    Some(TokenKind::Text(_)) => match self.expect_uint() {
                        Some(k) => (Some(k), false),
                        None => {
                            self.syntax_error(current_start, "expected an offset number or TIGHTLY_PACKED");
                            return;
                        }
                    },
                    _ => {
                        self.syntax_error(current_start, "expected an offset number or TIGHTLY_PACKED");
                        return;
                    }
                };
                let end = match self.tokens.get(self.pos) {
                    Some(t) if t.kind == TokenKind::DoubleRBrace => t.source_offset + 2,
                    _ => {
                        self.syntax_error(current_start, "malformed extended LOCATION directive, expected `}}`");
                        return;
                    }
                };
                self.pos += 1;
                self.push_location_slice(current_start, end, location);

                match self.try_parse_vertex_in_decl() {
                    Some((glsl_type, identifier)) => {
                        if self.stage != Stage::Vertex {
                            self.semantic_error(
                                current_start,
                                "extended LOCATION attribute directive used outside a vertex stage",
                            );
                            return;
                        }
                        self.out.vertex_attributes.push(VertexAttribute {
                            location,
                            binding,
                            glsl_type,
                            rate,
                            identifier,
                            offset,
                            is_tightly_packed,
                        });
                    }
                    None => self.semantic_error(
                        current_start,
                        "expected `in <type> <identifier>;` after extended LOCATION directive",
                    ),
                }
            }
            _ => self.syntax_error(current_start, "malformed LOCATION directive"),
        }
    }

    fn push_location_slice(&mut self, start: usize, end: usize, location: u32) {
        self.out.slices.push(TemplateSlice {
            start,
            end,
            vulkan_text: format!("layout(location = {}) ", location),
            opengl_text: String::new(),
        });
    }

    /// Look ahead for `in T id ;` without consuming on mismatch.
    fn try_parse_vertex_in_decl(&mut self) -> Option<(GlslType, String)> {
        let start = self.pos;
        if self.peek_kind() != Some(&TokenKind::In) {
            return None;
        }
        self.pos += 1;
        let glsl_type = match self.peek_kind().and_then(GlslType::from_token) {
            Some(t) => t,
            None => {
                self.pos = start;
                return None;
            }
        };
        self.pos += 1;
        let identifier = match self.expect_identifier() {
            Some(id) => id,
            None => {
                self.pos = start;
                return None;
            }
        };
        if !self.expect(&TokenKind::Semi) {
            self.pos = start;
            return None;
        }
        Some((glsl_type, identifier))
    }

    // ---- SET_BINDING -----------------------------------------------------

    fn parse_set_binding(&mut self, current_start: usize) {
        self.pos += 1; // consume SET_BINDING
        let set_id = match self.expect_uint() {
            Some(n) => n,
            None => {
                self.syntax_error(current_start, "expected a set number after SET_BINDING");
                return;
            }
        };
        let binding = match self.expect_uint() {
            Some(n) => n,
            None => {
                self.syntax_error(current_start, "expected a binding number");
                return;
            }
        };
        let mut buffer_label = None;
        if self.peek_kind() == Some(&TokenKind::KwBufferLabel) {
            self.pos += 1;
            match self.expect_identifier() {
                Some(label) => buffer_label = Some(label),
                None => {
                    self.syntax_error(current_start, "expected a label after BUFFER_LABEL");
                    return;
                }
            }
        }
        let end = match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::DoubleRBrace => t.source_offset + 2,
            _ => {
                self.syntax_error(current_start, "malformed SET_BINDING directive, expected `}}`");
                return;
            }
        };
        self.pos += 1;
        self.out.slices.push(TemplateSlice {
            start: current_start,
            end,
            vulkan_text: format!("layout(set = {}, binding = {}) ", set_id, binding),
            opengl_text: String::new(),
        });

        match self.parse_descriptor_shape(set_id, binding, buffer_label) {
            Ok(binding_layout) => self.out.descriptor_bindings.push(binding_layout),
            Err(message) => self.semantic_error(current_start, &message),
        }
    }

    /// Parse (without substituting) the GLSL declaration following a
    /// SET_BINDING directive, recovering the descriptor shape.
    fn parse_descriptor_shape(
        &mut self,
        set_id: u32,
        binding: u32,
        buffer_label: Option<String>,
    ) -> Result<SetBindingLayout, String> {
        if !self.expect(&TokenKind::Uniform) {
            return Err("expected `uniform` after SET_BINDING directive".to_owned());
        }
        match self.peek_kind().cloned() {
            Some(TokenKind::Sampler2D) => {
                self.pos += 1;
                let _identifier = self
                    .expect_identifier()
                    .ok_or_else(|| "expected a sampler identifier".to_owned())?;
                if !self.expect(&TokenKind::Semi) {
                    return Err("expected `;` after sampler declaration".to_owned());
                }
                if buffer_label.is_some() {
                    return Err("BUFFER_LABEL is illegal on a sampler2D binding".to_owned());
                }
                Ok(SetBindingLayout {
                    set_id,
                    binding,
                    descriptor_type: DescriptorType::Sampler2D,
                    struct_desc: None,
                    buffer_label: None,
                })
            }
            Some(TokenKind::Text(typename)) => {
                self.pos += 1;
                if !self.expect(&TokenKind::LBrace) {
                    return Err("expected `{` to open uniform block body".to_owned());
                }
                let mut builder = Std140LayoutBuilder::new();
                loop {
                    if self.expect(&TokenKind::RBrace) {
                        break;
                    }
                    let glsl_type = self
                        .peek_kind()
                        .and_then(GlslType::from_token)
                        .ok_or_else(|| "expected a member type".to_owned())?;
                    self.pos += 1;
                    let member_name = self
                        .expect_identifier()
                        .ok_or_else(|| "expected a member identifier".to_owned())?;
                    let array_size = if self.expect(&TokenKind::LBracket) {
                        let n = self
                            .expect_uint()
                            .ok_or_else(|| "expected an array length".to_owned())?;
                        if !self.expect(&TokenKind::RBracket) {
                            return Err("expected `]` after array length".to_owned());
                        }
                        Some(n)
                    } else {
                        None
                    };
                    if !self.expect(&TokenKind::Semi) {
                        return Err("expected `;` after struct member".to_owned());
                    }
                    builder
                        .add_member(member_name, glsl_type, array_size)
                        .map_err(|e| e.to_string())?;
                }
                let identifier = self
                    .expect_identifier()
                    .ok_or_else(|| "expected a block instance identifier".to_owned())?;
                if !self.expect(&TokenKind::Semi) {
                    return Err("expected `;` after uniform block declaration".to_owned());
                }
                let (members, size) = builder.finish();
                Ok(SetBindingLayout {
                    set_id,
                    binding,
                    descriptor_type: DescriptorType::UniformBuffer,
                    struct_desc: Some(StructDescription {
                        typename,
                        identifier,
                        size,
                        members,
                    }),
                    buffer_label,
                })
            }
            _ => Err("expected `sampler2D` or a uniform block type name".to_owned()),
        }
    }

    // ---- PUSH_CONSTANT -----------------------------------------------------

    /// Stub: the directive is recognized but has no defined body in the
    /// template language (open question, left unresolved). We log and skip
    /// to the next `}}` without recording a slice, so the raw directive
    /// text is replayed verbatim by the rewriter in both backends.
    fn parse_push_constant(&mut self, current_start: usize) {
        log::warn!(
            "PUSH_CONSTANT directive at byte {} is not implemented",
            current_start
        );
        self.pos += 1; // consume PUSH_CONSTANT
        self.resync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::lex;

    #[test]
    fn version_directive_produces_one_slice() {
        let src = "#version {{ VERSION }}\nvoid main(){}\n";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert_eq!(out.slices.len(), 1);
        assert_eq!(out.slices[0].vulkan_text, "450\n");
        assert_eq!(out.slices[0].opengl_text, "410 core\n");
    }

    #[test]
    fn bare_location_in_fragment_stage() {
        let src = "{{ LOCATION 0 }} out vec4 frag_color;";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert_eq!(out.slices[0].vulkan_text, "layout(location = 0) ");
        assert_eq!(out.slices[0].opengl_text, "");
        assert!(out.vertex_attributes.is_empty());
    }

    #[test]
    fn extended_location_records_vertex_attribute() {
        let src = "{{ LOCATION 0 BINDING 0 RATE_VERTEX OFFSET TIGHTLY_PACKED }} in vec3 pos;";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Vertex).unwrap();
        assert_eq!(out.vertex_attributes.len(), 1);
        let attr = &out.vertex_attributes[0];
        assert_eq!(attr.location, 0);
        assert_eq!(attr.binding, 0);
        assert_eq!(attr.glsl_type, GlslType::Vec3);
        assert_eq!(attr.identifier, "pos");
        assert!(attr.is_tightly_packed);
    }

    #[test]
    fn extended_location_outside_vertex_stage_is_rejected() {
        let src = "{{ LOCATION 0 BINDING 0 RATE_VERTEX OFFSET TIGHTLY_PACKED }} in vec3 pos;";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert!(out.vertex_attributes.is_empty());
        assert_eq!(out.slices.len(), 1); // substitution still happens
    }

    #[test]
    fn set_binding_sampler() {
        let src = "{{ SET_BINDING 0 1 }} uniform sampler2D tex;";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert_eq!(out.descriptor_bindings.len(), 1);
        assert_eq!(
            out.descriptor_bindings[0].descriptor_type,
            DescriptorType::Sampler2D
        );
    }

    #[test]
    fn set_binding_uniform_block() {
        let src = "{{ SET_BINDING 0 0 }} uniform Mvp { mat4 m; } u;";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Vertex).unwrap();
        let binding = &out.descriptor_bindings[0];
        assert_eq!(binding.descriptor_type, DescriptorType::UniformBuffer);
        let desc = binding.struct_desc.as_ref().unwrap();
        assert_eq!(desc.typename, "Mvp");
        assert_eq!(desc.identifier, "u");
        assert_eq!(desc.size, 64);
    }

    #[test]
    fn buffer_label_illegal_on_sampler() {
        let src = "{{ SET_BINDING 0 0 BUFFER_LABEL foo }} uniform sampler2D tex;";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert!(out.descriptor_bindings.is_empty());
        assert_eq!(out.slices.len(), 1);
    }

    #[test]
    fn ambiguous_directive_is_fatal() {
        let src = "{{ NOT_A_DIRECTIVE }}";
        let tokens = lex(src);
        assert!(parse(&tokens, Stage::Fragment).is_err());
    }

    #[test]
    fn malformed_version_resyncs_and_continues() {
        let src = "{{ VERSION extra }} {{ LOCATION 3 }}";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert_eq!(out.slices.len(), 1);
        assert_eq!(out.slices[0].vulkan_text, "layout(location = 3) ");
    }

    #[test]
    fn push_constant_is_skipped_without_slice() {
        let src = "{{ PUSH_CONSTANT }} {{ VERSION }}";
        let tokens = lex(src);
        let out = parse(&tokens, Stage::Fragment).unwrap();
        assert_eq!(out.slices.len(), 1);
        assert_eq!(out.slices[0].vulkan_text, "450\n");
    }
}
