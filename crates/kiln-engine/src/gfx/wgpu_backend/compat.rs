//! Rewrites preprocessed GLSL into the Vulkan-flavored dialect naga's frontend accepts.

use crate::gfx::api::BlockBinding;

const TARGET_VERSION: &str = "#version 450";
const BLOCK_PREFIX: &str = "layout(std140) uniform ";

/// - `#version` becomes 450
/// - `#extension` lines are dropped
/// - generated uniform blocks get `set = 0, binding = <index into blocks>`
pub(crate) fn to_vulkan_glsl(source: &str, blocks: &[BlockBinding]) -> String {
    let mut out = String::with_capacity(source.len() + 64);
    let mut has_version = false;

    for line in source.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("#version") {
            has_version = true;
            out.push_str(TARGET_VERSION);
        } else if trimmed.starts_with("#extension") {
            continue;
        } else if let Some(rest) = trimmed.strip_prefix(BLOCK_PREFIX) {
            let name_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let name = &rest[..name_len];
            match blocks.iter().position(|b| b.block == name) {
                Some(binding) => {
                    out.push_str(&format!(
                        "layout(std140, set = 0, binding = {binding}) uniform {rest}"
                    ));
                }
                None => out.push_str(line),
            }
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    if has_version {
        out
    } else {
        format!("{TARGET_VERSION}\n{out}")
    }
}
