//! Recover runnable code from a raw LLM response.
//!
//! Responses arrive in a few shapes: a markdown fenced block surrounded by
//! prose, bare code, or something else entirely. [`extract_code`] handles all
//! of them and never fails.

/// Marker that opens and closes a fenced block.
const FENCE: &str = "```";

/// Line starts that identify an unfenced response as Python source.
const CODE_MARKERS: [&str; 2] = ["#!/usr/bin/env python", "import "];

/// Extract the code from `response`.
///
/// - The first fenced block wins. The opening fence line (with its language
///   tag) is dropped; the closing fence ends the scan, so later blocks are
///   ignored. An unclosed fence runs to the end of the input.
/// - Without a fence, a line that looks like a Python shebang or an `import`
///   statement marks the whole response as code.
/// - If nothing was captured, the trimmed response is returned as-is.
///
/// A fence-looking line inside a block closes it; there is no nesting.
pub fn extract_code(response: &str) -> String {
    let lines: Vec<&str> = response.split('\n').collect();

    let mut in_block = false;
    let mut captured: Vec<&str> = Vec::new();

    for line in &lines {
        let trimmed = line.trim();
        if trimmed.starts_with(FENCE) {
            if in_block {
                break;
            }
            in_block = true;
            continue;
        }

        if in_block {
            captured.push(line);
        } else if CODE_MARKERS.iter().any(|m| trimmed.starts_with(m)) {
            captured = lines.clone();
            break;
        }
    }

    let code = captured.join("\n").trim().to_string();
    if code.is_empty() {
        response.trim().to_string()
    } else {
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_prose() {
        let response = "preamble\n```python\nprint(1)\n```\ntrailer";
        assert_eq!(extract_code(response), "print(1)");
    }

    #[test]
    fn test_unfenced_import_keeps_everything() {
        let response = "import os\nprint(1)";
        assert_eq!(extract_code(response), "import os\nprint(1)");
    }

    #[test]
    fn test_unfenced_import_after_prose_keeps_prose() {
        // The whole response is taken, including the leading sentence.
        let response = "Here you go:\nimport os\nprint(os.getcwd())\n";
        assert_eq!(
            extract_code(response),
            "Here you go:\nimport os\nprint(os.getcwd())"
        );
    }

    #[test]
    fn test_unfenced_shebang_marker() {
        let response = "  #!/usr/bin/env python3\nprint('hi')\n\n";
        assert_eq!(extract_code(response), "#!/usr/bin/env python3\nprint('hi')");
    }

    #[test]
    fn test_only_first_block_is_captured() {
        let response = "First:\n```python\na = 1\n```\nSecond:\n```python\nb = 2\n```";
        assert_eq!(extract_code(response), "a = 1");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let response = "```python\nimport sys\nsys.exit(3)\n";
        assert_eq!(extract_code(response), "import sys\nsys.exit(3)");
    }

    #[test]
    fn test_block_lines_kept_verbatim() {
        let response = "```\ndef f():\n    return 1\n\nprint(f())\n```";
        assert_eq!(extract_code(response), "def f():\n    return 1\n\nprint(f())");
    }

    #[test]
    fn test_import_inside_block_does_not_take_whole_response() {
        let response = "Intro\n```py\nimport os\n```\nOutro";
        assert_eq!(extract_code(response), "import os");
    }

    #[test]
    fn test_indented_fence_recognized() {
        let response = "Text\n   ```python\nx = 1\n   ```";
        assert_eq!(extract_code(response), "x = 1");
    }

    #[test]
    fn test_inner_fence_closes_block_early() {
        let response = "```python\ns = '''\n```\n'''\n```";
        assert_eq!(extract_code(response), "s = '''");
    }

    #[test]
    fn test_empty_block_falls_back_to_response() {
        let response = "  nothing here\n```\n```\n";
        assert_eq!(extract_code(response), "nothing here\n```\n```");
    }

    #[test]
    fn test_plain_text_falls_back_to_trimmed_input() {
        assert_eq!(extract_code("  print('hi')  \n"), "print('hi')");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_code(""), "");
        assert_eq!(extract_code("\n\n  \n"), "");
    }

    #[test]
    fn test_crlf_response() {
        let response = "Sure\r\n```python\r\nprint(1)\r\n```\r\n";
        assert_eq!(extract_code(response), "print(1)");
    }
}
