//! Text rewriter: replays the original source with recorded slices
//! substituted per backend, using a single-pass copy loop over byte
//! ranges rather than lines, since the directive parser addresses by
//! byte offset.

use crate::types::{Backend, TemplateSlice};

/// Replay `source`, substituting each slice's backend-specific text.
/// Slices must be in non-decreasing `start` order and non-overlapping
/// (the directive parser guarantees this by construction, since it only
/// ever appends slices as it scans forward through the token stream).
pub fn rewrite(source: &str, slices: &[TemplateSlice], backend: Backend) -> String {
    let mut out = String::with_capacity(source.len());
    let mut prev_end = 0usize;

    for slice in slices {
        out.push_str(&source[prev_end..slice.start]);
        match backend {
            Backend::Vulkan => out.push_str(&slice.vulkan_text),
            Backend::OpenGl => out.push_str(&slice.opengl_text),
        }
        prev_end = slice.end;
    }
    out.push_str(&source[prev_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_with_no_slices() {
        let src = "void main(){}\n";
        assert_eq!(rewrite(src, &[], Backend::Vulkan), src);
        assert_eq!(rewrite(src, &[], Backend::OpenGl), src);
    }

    #[test]
    fn pure_version_scenario() {
        let src = "#version {{ VERSION }}\nvoid main(){}\n";
        let slices = vec![TemplateSlice {
            start: 9,
            end: 23,
            vulkan_text: "450\n".to_owned(),
            opengl_text: "410 core\n".to_owned(),
        }];
        let vulkan = rewrite(src, &slices, Backend::Vulkan);
        let opengl = rewrite(src, &slices, Backend::OpenGl);
        assert!(vulkan.starts_with("#version 450\nvoid main(){}\n"));
        assert!(opengl.starts_with("#version 410 core\nvoid main(){}\n"));
    }

    #[test]
    fn fragment_single_location_out_scenario() {
        let src = "{{ LOCATION 0 }} out vec4 frag_color;";
        let slices = vec![TemplateSlice {
            start: 0,
            end: 16,
            vulkan_text: "layout(location = 0) ".to_owned(),
            opengl_text: String::new(),
        }];
        assert_eq!(
            rewrite(src, &slices, Backend::Vulkan),
            "layout(location = 0)  out vec4 frag_color;"
        );
        assert_eq!(
            rewrite(src, &slices, Backend::OpenGl),
            " out vec4 frag_color;"
        );
    }
}
