//! Binding discovery by scanning GLSL source text.
//!
//! Uniform blocks get binding points and samplers get texture units in
//! declaration order, vertex stage first. The scan is purely textual; it
//! does not need a compiled program.
//!
//! Two block spellings are recognized:
//! - `uniform Name { ... };` (GLSL ES 3.00 uniform blocks)
//! - `uniform vec4 Name[N];` (the emulated form used on WebGL1, where the
//!   device uploads the block's bytes to the `vec4` array)

/// A sampler uniform and the number of units it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSampler {
    pub name: String,
    pub array_size: u32,
}

/// Bindings discovered in a program's sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBindings {
    /// Uniform block names; index = binding point.
    pub uniform_blocks: Vec<String>,
    /// Sampler uniforms; units are assigned consecutively.
    pub samplers: Vec<ShaderSampler>,
}

impl ShaderBindings {
    /// Saturates at `u32::MAX`.
    pub fn num_sampler_units(&self) -> u32 {
        self.samplers.iter().fold(0u32, |n, s| n.saturating_add(s.array_size))
    }

    /// First texture unit of each sampler.
    pub fn sampler_units(&self) -> impl Iterator<Item = (&ShaderSampler, u32)> {
        self.samplers.iter().scan(0u32, |next, s| {
            let unit = *next;
            *next = unit.saturating_add(s.array_size);
            Some((s, unit))
        })
    }

    fn add_block(&mut self, name: &str) {
        if !self.uniform_blocks.iter().any(|b| b == name) {
            self.uniform_blocks.push(name.to_string());
        }
    }

    fn add_sampler(&mut self, name: &str, array_size: u32) {
        if !self.samplers.iter().any(|s| s.name == name) {
            self.samplers.push(ShaderSampler {
                name: name.to_string(),
                array_size,
            });
        }
    }
}

/// Scans one or more stage sources, in order.
pub fn scan_shader_bindings<'a>(sources: impl IntoIterator<Item = &'a str>) -> ShaderBindings {
    let mut bindings = ShaderBindings::default();
    for source in sources {
        scan_source(&strip_comments(source), &mut bindings);
    }
    bindings
}

const PRECISIONS: [&str; 3] = ["lowp", "mediump", "highp"];

fn scan_source(source: &str, out: &mut ShaderBindings) {
    let tokens = tokenize(source);
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] != "uniform" {
            i += 1;
            continue;
        }
        i += 1;
        while i < tokens.len() && PRECISIONS.contains(&tokens[i]) {
            i += 1;
        }
        let (Some(&first), Some(&second)) = (tokens.get(i), tokens.get(i + 1)) else {
            break;
        };

        if second == "{" {
            out.add_block(first);
            i += 2;
            continue;
        }

        let ty = first;
        let name = second;
        let array_size = match (tokens.get(i + 2), tokens.get(i + 3), tokens.get(i + 4)) {
            (Some(&"["), Some(n), Some(&"]")) => n.parse::<u32>().ok(),
            _ => None,
        };

        if is_sampler_type(ty) {
            out.add_sampler(name, array_size.unwrap_or(1));
        } else if ty == "vec4" && array_size.is_some() {
            out.add_block(name);
        }
        i += 2;
    }
}

fn is_sampler_type(ty: &str) -> bool {
    ty.starts_with("sampler") || ty.starts_with("isampler") || ty.starts_with("usampler")
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Identifiers/numbers and single punctuation characters.
fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in source.char_indices() {
        let word = c.is_ascii_alphanumeric() || c == '_';
        match (word, start) {
            (true, None) => start = Some(i),
            (true, Some(_)) => {}
            (false, Some(s)) => {
                tokens.push(&source[s..i]);
                start = None;
            }
            (false, None) => {}
        }
        if !word && !c.is_whitespace() {
            tokens.push(&source[i..i + c.len_utf8()]);
        }
    }
    if let Some(s) = start {
        tokens.push(&source[s..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
        precision mediump float;
        layout(std140) uniform ub_SceneParams {
            mat4 u_Projection;
        };
        layout(std140) uniform ub_ObjectParams { vec4 u_Color; };
        in vec3 a_Position;
        void main() { gl_Position = u_Projection * vec4(a_Position, 1.0); }
    "#;

    const FS: &str = r#"
        // uniform sampler2D u_Commented;
        uniform sampler2D u_Texture;
        uniform highp sampler2DArray u_Layers[3];
        /* uniform Ignored { vec4 x; }; */
        uniform ub_SceneParams { mat4 u_Projection; };
        out vec4 o_Color;
        void main() { o_Color = texture(u_Texture, vec2(0.0)); }
    "#;

    #[test]
    fn blocks_in_declaration_order_deduplicated() {
        let b = scan_shader_bindings([VS, FS]);
        assert_eq!(b.uniform_blocks, vec!["ub_SceneParams", "ub_ObjectParams"]);
    }

    #[test]
    fn samplers_with_array_sizes() {
        let b = scan_shader_bindings([VS, FS]);
        assert_eq!(
            b.samplers,
            vec![
                ShaderSampler { name: "u_Texture".into(), array_size: 1 },
                ShaderSampler { name: "u_Layers".into(), array_size: 3 },
            ]
        );
        assert_eq!(b.num_sampler_units(), 4);
        let units: Vec<u32> = b.sampler_units().map(|(_, u)| u).collect();
        assert_eq!(units, vec![0, 1]);
    }

    #[test]
    fn unit_totals_saturate() {
        let b = scan_shader_bindings(["uniform sampler2D u_A[4294967295];\nuniform sampler2D u_B[2];\nuniform sampler2D u_C;"]);
        assert_eq!(b.num_sampler_units(), u32::MAX);
        let units: Vec<u32> = b.sampler_units().map(|(_, u)| u).collect();
        assert_eq!(units, vec![0, u32::MAX, u32::MAX]);
    }

    #[test]
    fn emulated_blocks_are_vec4_arrays() {
        let src = "uniform vec4 ub_Params[4];\nuniform vec4 u_NotAnArray;\nuniform sampler2D u_T;";
        let b = scan_shader_bindings([src]);
        assert_eq!(b.uniform_blocks, vec!["ub_Params"]);
        assert_eq!(b.samplers.len(), 1);
    }

    #[test]
    fn comments_are_ignored() {
        let b = scan_shader_bindings(["// uniform sampler2D a;\n/* uniform B { }; */"]);
        assert_eq!(b, ShaderBindings::default());
    }
}
