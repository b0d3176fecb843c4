use crate::gfx::api::DriverInfo;
use crate::gfx::param::ParamRegistry;

use super::error::PreprocessError;

const UBO_EXTENSION: &str = "GL_ARB_uniform_buffer_object";

/// Lowest version with core uniform buffer support.
const MIN_VERSION: u32 = 140;
/// Version forced on drivers with legacy shader compilers.
const LEGACY_VERSION: u32 = 130;
/// Lowest version that accepts a profile token.
const PROFILE_VERSION: u32 = 150;

/// A param buffer pulled in by `#use`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedBlock {
    /// Param buffer name, as written after `#use`.
    pub buffer: String,
    /// Generated uniform block name (`<buffer>Layout`).
    pub block_name: String,
    /// Parameter names in declaration order.
    pub members: Vec<String>,
}

/// Output of [`ShaderPreprocessor::preprocess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedSource {
    pub text: String,
    /// Blocks in order of first `#use`.
    pub blocks: Vec<UsedBlock>,
    /// A rewritten `#version` guarantees uniform buffer support.
    pub uniform_buffers: bool,
    /// Last rewritten version, if the source declares one.
    pub version: Option<u32>,
}

/// Expands `#use` blocks and normalizes `#version` lines.
///
/// Single pass over the source lines. Version lines are kept aside and finalized after
/// the scan so an extension enable anywhere in the source is seen first.
pub struct ShaderPreprocessor<'a> {
    registry: &'a ParamRegistry,
    driver: &'a DriverInfo,
}

enum Segment {
    Text(String),
    Version { number: u32, profile: Option<String> },
}

impl<'a> ShaderPreprocessor<'a> {
    pub fn new(registry: &'a ParamRegistry, driver: &'a DriverInfo) -> Self {
        Self { registry, driver }
    }

    pub fn preprocess(&self, source: &str) -> Result<PreprocessedSource, PreprocessError> {
        let mut segments = Vec::new();
        let mut text = String::with_capacity(source.len());
        let mut blocks: Vec<UsedBlock> = Vec::new();
        let mut explicit_ubo = false;

        for (i, line) in source.lines().enumerate() {
            let lineno = i + 1;

            if let Some(rest) = directive(line, "use") {
                let name = parse_use(rest).ok_or_else(|| PreprocessError::MalformedUse {
                    line: lineno,
                    text: line.to_string(),
                })?;
                if blocks.iter().any(|b| b.buffer == name) {
                    continue;
                }
                let block = self.expand_use(name, lineno, &mut text)?;
                blocks.push(block);
                continue;
            }

            if let Some(rest) = directive(line, "version") {
                let (number, profile) = parse_version(rest).ok_or_else(|| {
                    PreprocessError::MalformedVersion {
                        line: lineno,
                        text: line.to_string(),
                    }
                })?;
                segments.push(Segment::Text(std::mem::take(&mut text)));
                segments.push(Segment::Version { number, profile });
                continue;
            }

            if enables_ubo_extension(line) {
                log::debug!("shader line {lineno}: explicit {UBO_EXTENSION} enable");
                explicit_ubo = true;
            }

            text.push_str(&rewrite_members(line, &blocks));
            text.push('\n');
        }
        segments.push(Segment::Text(text));

        let mut out = String::with_capacity(source.len() + 256);
        let mut uniform_buffers = false;
        let mut version = None;

        for segment in segments {
            match segment {
                Segment::Text(t) => out.push_str(&t),
                Segment::Version { number, profile } => {
                    let v = self.effective_version(number);
                    uniform_buffers |= v >= MIN_VERSION;
                    version = Some(v);

                    out.push_str(&format!("#version {v}"));
                    if let Some(p) = profile.filter(|_| v >= PROFILE_VERSION) {
                        out.push(' ');
                        out.push_str(&p);
                    }
                    out.push('\n');
                    if !explicit_ubo {
                        out.push_str(&format!("#extension {UBO_EXTENSION} : enable\n"));
                    }
                }
            }
        }

        Ok(PreprocessedSource {
            text: out,
            blocks,
            uniform_buffers,
            version,
        })
    }

    /// Appends the processed text to `out`. Leaves `out` untouched on error.
    pub fn preprocess_into(&self, source: &str, out: &mut Vec<String>) -> Result<(), PreprocessError> {
        let processed = self.preprocess(source)?;
        out.push(processed.text);
        Ok(())
    }

    fn effective_version(&self, declared: u32) -> u32 {
        if self.driver.needs_legacy_glsl() {
            LEGACY_VERSION
        } else {
            declared.max(MIN_VERSION)
        }
    }

    fn expand_use(&self, name: &str, line: usize, out: &mut String) -> Result<UsedBlock, PreprocessError> {
        let shared = self
            .registry
            .get(name)
            .ok_or_else(|| PreprocessError::UnknownParamBuffer {
                line,
                name: name.to_string(),
            })?;
        let buffer = shared.borrow();

        let block_name = format!("{name}Layout");
        out.push_str(&format!("layout(std140) uniform {block_name}\n{{\n"));
        for p in buffer.layout().params() {
            out.push_str(&format!("    {} {name}_{};\n", p.ty.glsl_name(), p.name));
        }
        out.push_str("};\n");

        log::debug!(
            "shader line {line}: #use {name} -> {block_name} ({} members)",
            buffer.layout().len()
        );

        Ok(UsedBlock {
            buffer: name.to_string(),
            block_name,
            members: buffer.layout().params().iter().map(|p| p.name.clone()).collect(),
        })
    }
}

// ── line helpers ──────────────────────────────────────────────────────────

/// Matches `#<keyword>` (whitespace allowed around `#`) and returns the rest of the line.
fn directive<'l>(line: &'l str, keyword: &str) -> Option<&'l str> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

fn parse_use(rest: &str) -> Option<&str> {
    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?;
    if tokens.next().is_some() || !is_identifier(name) {
        return None;
    }
    Some(name)
}

fn parse_version(rest: &str) -> Option<(u32, Option<String>)> {
    let mut tokens = rest.split_whitespace();
    let number = tokens.next()?.parse().ok()?;
    let profile = tokens.next().map(str::to_string);
    if tokens.next().is_some() {
        return None;
    }
    Some((number, profile))
}

fn enables_ubo_extension(line: &str) -> bool {
    let Some(pos) = line.find(UBO_EXTENSION) else {
        return false;
    };
    line[pos + UBO_EXTENSION.len()..]
        .split(|c: char| !is_ident_char(c))
        .any(|tok| tok == "enable" || tok == "require")
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

/// Length in bytes of the identifier run at the start of `s`.
fn ident_len(s: &str) -> usize {
    s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len())
}

/// Rewrites `<Block>.<member>` to `<Block>_<member>` for every used block.
///
/// Only whole identifiers match: `MySun.Color` is left alone. Only members the block
/// declares are flattened; `Sun.Radius` stays as written so the shader compiler reports
/// it against the original name.
fn rewrite_members(line: &str, blocks: &[UsedBlock]) -> String {
    if blocks.is_empty() || !line.contains('.') {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    let mut prev_ident = false;

    while let Some(c) = rest.chars().next() {
        if !is_ident_start(c) || prev_ident {
            out.push(c);
            prev_ident = is_ident_char(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }

        let len = ident_len(rest);
        let ident = &rest[..len];
        let after = &rest[len..];

        if let Some(member_src) = after.strip_prefix('.') {
            let member = &member_src[..ident_len(member_src)];
            let is_member = blocks
                .iter()
                .any(|b| b.buffer == ident && b.members.iter().any(|m| m == member));
            if is_member {
                out.push_str(ident);
                out.push('_');
                out.push_str(member);
                rest = &member_src[member.len()..];
                prev_ident = true;
                continue;
            }
        }

        out.push_str(ident);
        rest = after;
        prev_ident = true;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::BufferUsage;
    use crate::gfx::param::{ParamBuffer, ParamLayout};

    fn registry() -> ParamRegistry {
        let sun = ParamLayout::builder()
            .vec3("Direction")
            .vec4("Color")
            .vec4("ShadowColor")
            .float("Brightness")
            .build()
            .unwrap();
        let common = ParamLayout::builder().float("Time").float("DeltaTime").build().unwrap();

        let mut reg = ParamRegistry::new();
        reg.register(ParamBuffer::new("Sun", sun, BufferUsage::Static).unwrap()).unwrap();
        reg.register(ParamBuffer::new("Common", common, BufferUsage::Dynamic).unwrap()).unwrap();
        reg
    }

    fn run(source: &str) -> Result<PreprocessedSource, PreprocessError> {
        let reg = registry();
        let driver = DriverInfo::headless();
        ShaderPreprocessor::new(&reg, &driver).preprocess(source)
    }

    // ── #use ──────────────────────────────────────────────────────────────

    #[test]
    fn use_expands_block_and_rewrites_members() {
        let src = "#version 140\n#use Sun\nvoid main() { c = Sun.Color * Sun.Brightness; }\n";
        let out = run(src).unwrap();

        let expected = "#version 140\n\
            #extension GL_ARB_uniform_buffer_object : enable\n\
            layout(std140) uniform SunLayout\n\
            {\n    vec3 Sun_Direction;\n    vec4 Sun_Color;\n    vec4 Sun_ShadowColor;\n    float Sun_Brightness;\n};\n\
            void main() { c = Sun_Color * Sun_Brightness; }\n";
        assert_eq!(out.text, expected);
        assert_eq!(
            out.blocks,
            vec![UsedBlock {
                buffer: "Sun".into(),
                block_name: "SunLayout".into(),
                members: vec![
                    "Direction".into(),
                    "Color".into(),
                    "ShadowColor".into(),
                    "Brightness".into()
                ],
            }]
        );
    }

    #[test]
    fn rewrite_respects_identifier_boundaries() {
        let out = run("#use Sun\nx = MySun.Color + Sun.Color + Sun.Colorful;\n").unwrap();
        assert!(out.text.ends_with("x = MySun.Color + Sun_Color + Sun.Colorful;\n"));
    }

    #[test]
    fn undeclared_member_is_left_alone() {
        let out = run("#use Sun\nr = Sun.Radius;\nc = Sun.Color.rgb;\n").unwrap();
        assert!(out.text.contains("r = Sun.Radius;\n"));
        assert!(out.text.ends_with("c = Sun_Color.rgb;\n"));
    }

    #[test]
    fn lines_before_use_are_not_rewritten() {
        let out = run("a = Sun.Color;\n#use Sun\nb = Sun.Color;\n").unwrap();
        assert!(out.text.starts_with("a = Sun.Color;\n"));
        assert!(out.text.ends_with("b = Sun_Color;\n"));
    }

    #[test]
    fn repeated_use_expands_once() {
        let out = run("#use Common\n#use Common\nt = Common.Time;\n").unwrap();
        assert_eq!(out.text.matches("uniform CommonLayout").count(), 1);
        assert_eq!(out.blocks.len(), 1);
    }

    #[test]
    fn unknown_use_fails_and_leaves_output_untouched() {
        let reg = registry();
        let driver = DriverInfo::headless();
        let pre = ShaderPreprocessor::new(&reg, &driver);

        let mut out = vec!["previous".to_string()];
        let err = pre.preprocess_into("#version 140\n#use Moon\n", &mut out).unwrap_err();

        assert_eq!(err, PreprocessError::UnknownParamBuffer { line: 2, name: "Moon".into() });
        assert_eq!(out, vec!["previous".to_string()]);
    }

    #[test]
    fn use_without_name_is_malformed() {
        assert!(matches!(run("#use\n"), Err(PreprocessError::MalformedUse { line: 1, .. })));
        assert!(matches!(run("#use Sun Moon\n"), Err(PreprocessError::MalformedUse { .. })));
    }

    // ── #version ──────────────────────────────────────────────────────────

    #[test]
    fn old_version_is_raised_with_extension() {
        let out = run("#version 120\n").unwrap();
        assert_eq!(out.text, "#version 140\n#extension GL_ARB_uniform_buffer_object : enable\n");
        assert!(out.uniform_buffers);
        assert_eq!(out.version, Some(140));
    }

    #[test]
    fn legacy_driver_forces_130() {
        let reg = registry();
        let driver = DriverInfo::new("Intel", "Intel(R) HD Graphics", "gl");
        let out = ShaderPreprocessor::new(&reg, &driver)
            .preprocess("#version 150 core\n")
            .unwrap();

        assert_eq!(out.text, "#version 130\n#extension GL_ARB_uniform_buffer_object : enable\n");
        assert!(!out.uniform_buffers);
    }

    #[test]
    fn profile_kept_from_150() {
        let out = run("#version 330 core\n").unwrap();
        assert!(out.text.starts_with("#version 330 core\n"));

        let out = run("#version 120 compatibility\n").unwrap();
        assert!(out.text.starts_with("#version 140\n"));
    }

    #[test]
    fn explicit_enable_suppresses_injection() {
        let src = "#version 120\n#extension GL_ARB_uniform_buffer_object : enable\n";
        let out = run(src).unwrap();
        assert_eq!(out.text, src.replace("120", "140"));
        assert_eq!(out.text.matches("#extension").count(), 1);
    }

    #[test]
    fn disable_does_not_count_as_enable() {
        let out = run("#version 140\n#extension GL_ARB_uniform_buffer_object : disable\n").unwrap();
        assert_eq!(out.text.matches("#extension").count(), 2);
    }

    #[test]
    fn malformed_version_is_an_error() {
        assert!(matches!(run("#version\n"), Err(PreprocessError::MalformedVersion { line: 1, .. })));
        assert!(matches!(
            run("// header\n#version abc\n"),
            Err(PreprocessError::MalformedVersion { line: 2, .. })
        ));
    }

    #[test]
    fn source_without_version_passes_through() {
        let out = run("void main() {}\n").unwrap();
        assert_eq!(out.text, "void main() {}\n");
        assert_eq!(out.version, None);
        assert!(!out.uniform_buffers);
    }
}
