//! Line-level removal of dangerous imports and calls.

use optiloop_core::{CodeArtifact, OptimizeError};
use regex::Regex;
use tracing::warn;

/// Modules whose imports are stripped before execution.
pub const DANGEROUS_MODULES: &[&str] = &[
    "os",
    "sys",
    "subprocess",
    "shutil",
    "pickle",
    "marshal",
    "socket",
    "urllib",
    "requests",
    "http",
    "ftplib",
    "multiprocessing",
    "threading",
    "ctypes",
    "cffi",
];

/// Builtins whose direct calls are replaced with `pass`.
pub const DANGEROUS_CALLS: &[&str] = &["eval", "exec", "compile", "__import__"];

/// Sanitized code plus what was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedCode {
    /// Code safe to hand to the sandbox
    pub code: CodeArtifact,

    /// One message per removal
    pub warnings: Vec<String>,
}

/// Strips dangerous imports and calls from Python source.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    modules: Vec<String>,
    import_re: Regex,
    from_re: Regex,
    call_re: Regex,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DANGEROUS_MODULES.iter().map(|m| m.to_string()).collect())
    }
}

impl Sanitizer {
    /// Sanitizer with a custom module deny-list.
    pub fn new(modules: Vec<String>) -> Self {
        let calls = DANGEROUS_CALLS.join("|");
        Self {
            modules,
            import_re: Regex::new(r"^(\s*)import\s+(.+?)\s*$").expect("Invalid import regex"),
            from_re: Regex::new(r"^\s*from\s+([\w.]+)\s+import\b").expect("Invalid from-import regex"),
            call_re: Regex::new(&format!(r"(?:^|[^\w.])({})\s*\(", calls)).expect("Invalid dangerous call regex"),
        }
    }

    fn is_dangerous(&self, module: &str) -> bool {
        let root = module.split('.').next().unwrap_or(module);
        self.modules.iter().any(|m| m == root)
    }

    /// Sanitize source text.
    ///
    /// Empty input is an error. When every line would be removed, the
    /// trimmed original is returned with a warning instead.
    pub fn sanitize(&self, code: &str) -> Result<SanitizedCode, OptimizeError> {
        if code.trim().is_empty() {
            return Err(OptimizeError::EmptyInput);
        }

        let mut warnings = Vec::new();
        let mut kept = Vec::new();

        for line in code.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(line) = self.sanitize_line(line, &mut warnings) {
                kept.push(line);
            }
        }

        if kept.is_empty() {
            warnings.push("Sanitization removed all code, returning original".to_string());
            warn!("Sanitization removed all code, returning original");
            return Ok(SanitizedCode {
                code: CodeArtifact::new(code.trim()),
                warnings,
            });
        }

        Ok(SanitizedCode {
            code: CodeArtifact::new(kept.join("\n")),
            warnings,
        })
    }

    fn sanitize_line(&self, line: &str, warnings: &mut Vec<String>) -> Option<String> {
        if let Some(caps) = self.from_re.captures(line) {
            let module = &caps[1];
            if self.is_dangerous(module) {
                warnings.push(format!("Removed dangerous import: {}", module));
                return None;
            }
            return Some(line.to_string());
        }

        if let Some(caps) = self.import_re.captures(line) {
            let indent = &caps[1];
            let names = &caps[2];
            // `import a, b as c` keeps the safe names
            let mut safe = Vec::new();
            for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let module = name.split_whitespace().next().unwrap_or(name);
                if self.is_dangerous(module) {
                    warnings.push(format!("Removed dangerous import: {}", module));
                } else {
                    safe.push(name);
                }
            }
            if safe.is_empty() {
                return None;
            }
            return Some(format!("{}import {}", indent, safe.join(", ")));
        }

        let stripped = line.trim_start();
        if stripped.starts_with("def ") || stripped.starts_with('#') {
            return Some(line.to_string());
        }

        if let Some(caps) = self.call_re.captures(line) {
            warnings.push(format!("Removed dangerous call: {}", &caps[1]));
            let indent = &line[..line.len() - stripped.len()];
            return Some(format!("{}pass", indent));
        }

        Some(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_code_untouched() {
        let sanitized = Sanitizer::default()
            .sanitize("import math\n\nprint(math.sqrt(4))\n")
            .unwrap();
        assert_eq!(sanitized.code.text(), "import math\nprint(math.sqrt(4))");
        assert!(sanitized.warnings.is_empty());
    }

    #[test]
    fn test_removes_dangerous_imports() {
        let code = "import os\nfrom subprocess import run\nimport os.path\nx = 1";
        let sanitized = Sanitizer::default().sanitize(code).unwrap();
        assert_eq!(sanitized.code.text(), "x = 1");
        assert_eq!(sanitized.warnings.len(), 3);
        assert!(sanitized.warnings[0].contains("os"));
    }

    #[test]
    fn test_keeps_safe_names_in_mixed_import() {
        let sanitized = Sanitizer::default()
            .sanitize("import math, sys as s, json\nprint(1)")
            .unwrap();
        assert_eq!(sanitized.code.text(), "import math, json\nprint(1)");
        assert_eq!(sanitized.warnings, vec!["Removed dangerous import: sys"]);
    }

    #[test]
    fn test_replaces_dangerous_calls_with_pass() {
        let code = "def f(s):\n    x = eval(s)\n    return 1";
        let sanitized = Sanitizer::default().sanitize(code).unwrap();
        assert_eq!(sanitized.code.text(), "def f(s):\n    pass\n    return 1");
        assert_eq!(sanitized.warnings, vec!["Removed dangerous call: eval"]);
    }

    #[test]
    fn test_attribute_calls_are_not_dangerous() {
        let code = "import re\np = re.compile('a')";
        let sanitized = Sanitizer::default().sanitize(code).unwrap();
        assert_eq!(sanitized.code.text(), code);
        assert!(sanitized.warnings.is_empty());
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            Sanitizer::default().sanitize("  \n "),
            Err(OptimizeError::EmptyInput)
        ));
    }

    #[test]
    fn test_everything_removed_returns_original() {
        let sanitized = Sanitizer::default().sanitize("  import os\n").unwrap();
        assert_eq!(sanitized.code.text(), "import os");
        assert_eq!(sanitized.warnings.len(), 2);
    }
}
