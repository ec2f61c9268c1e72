//! Observation layout.
//!
//! | dims | content |
//! |---|---|
//! | 0-3 | size, complexity, nesting, recursion |
//! | 4-13 | node counts |
//! | 14-18 | baseline metrics, lint/test constants, loops |
//! | 19-31 | size proxy block |
//! | 32-35 | definitions |
//! | 36-39 | style |
//! | 40-43 | structure |
//! | 44-47 | derived estimators |
//! | 48-51 | pattern flags |
//! | 52-55 | control flow |
//! | 56-59 | data structures |
//! | 60-63 | quality proxies |

use crate::scanner::{scan, ScanReport};
use optiloop_core::{Observation, OBSERVATION_DIM};
use tracing::debug;

/// Placeholder lint score until a linter is wired in.
pub const LINT_SCORE: f32 = 0.8;

/// Placeholder test pass ratio.
pub const TEST_PASS_RATIO: f32 = 1.0;

fn ratio(value: f64, scale: f64) -> f32 {
    (value / scale) as f32
}

fn flag(present: bool) -> f32 {
    if present {
        1.0
    } else {
        0.0
    }
}

/// Encode code and its baseline metrics into a 64-dim observation.
///
/// Never fails: empty or unparseable code yields the zero vector.
pub fn encode(code: &str, baseline_runtime: f64, baseline_memory: f64) -> Observation {
    if code.trim().is_empty() {
        return Observation::zeros();
    }
    match scan(code) {
        Ok(report) => encode_report(&report, baseline_runtime, baseline_memory),
        Err(e) => {
            debug!("Encoding zero observation for unscannable code: {}", e);
            Observation::zeros()
        }
    }
}

/// Encode an existing scan report.
pub fn encode_report(report: &ScanReport, baseline_runtime: f64, baseline_memory: f64) -> Observation {
    let mut f = [0.0f32; OBSERVATION_DIM];
    let r = report;
    let lines = r.lines as f64;
    let chars = r.chars as f64;
    let functions = r.functions as f64;

    f[0] = ratio(lines, 1000.0);
    f[1] = ratio(r.max_complexity as f64, 50.0);
    f[2] = ratio(r.max_nesting as f64, 10.0);
    f[3] = flag(r.recursive);

    let nodes = [
        r.nodes.defs,
        r.nodes.fors,
        r.nodes.whiles,
        r.nodes.ifs,
        r.nodes.lists,
        r.nodes.dicts,
        r.nodes.sets,
        r.nodes.tuples,
        r.nodes.calls,
        r.nodes.binops,
    ];
    for (i, count) in nodes.iter().enumerate() {
        f[4 + i] = ratio(*count as f64, 100.0);
    }

    f[14] = ratio(baseline_runtime, 10.0);
    f[15] = ratio(baseline_memory, 100.0);
    f[16] = LINT_SCORE;
    f[17] = TEST_PASS_RATIO;
    f[18] = ratio(r.loops() as f64, 50.0);

    f[19] = ratio(lines, 1000.0);
    f[20] = ratio(chars, 10000.0);
    f[21] = ratio(functions, 50.0);
    f[22] = ratio(r.classes as f64, 20.0);
    f[23] = ratio(r.imports as f64, 20.0);
    let size_proxy = ratio(lines + chars + functions, 10000.0);
    for slot in &mut f[24..32] {
        *slot = size_proxy;
    }

    f[32] = ratio(functions, 50.0);
    f[33] = ratio(r.classes as f64, 20.0);
    f[34] = ratio(r.imports as f64, 20.0);
    f[35] = ratio(r.decorators as f64, 10.0);

    f[36] = ratio(r.avg_line_length, 100.0);
    f[37] = ratio(r.max_line_length as f64, 200.0);
    f[38] = ratio(r.comment_lines as f64, lines.max(1.0));
    f[39] = ratio(r.docstrings as f64, ((r.functions + r.classes) as f64).max(1.0));

    f[40] = ratio(r.max_function_length as f64, 200.0);
    f[41] = ratio(r.avg_function_length, 100.0);
    f[42] = ratio(r.max_nesting as f64, 10.0);
    f[43] = ratio(r.avg_nesting, 5.0);

    // Estimators reuse already-clamped inputs.
    let clamp = |v: f32| v.clamp(0.0, 1.0);
    f[44] = clamp(f[1]) * clamp(f[2]);
    f[45] = clamp(f[0]) * clamp(f[1]);
    f[46] = clamp(f[0]) * clamp(f[18]);
    f[47] = ratio(chars, 10000.0);

    f[48] = flag(r.list_comprehensions > 0);
    f[49] = flag(r.generator_expressions > 0);
    f[50] = flag(r.lambdas > 0);
    f[51] = flag(r.decorators > 0);

    f[52] = ratio(r.nodes.ifs as f64, 50.0);
    f[53] = ratio(r.nodes.fors as f64, 50.0);
    f[54] = ratio(r.nodes.whiles as f64, 20.0);
    f[55] = ratio(r.tries as f64, 10.0);

    f[56] = ratio(r.nodes.lists as f64, 50.0);
    f[57] = ratio(r.nodes.dicts as f64, 50.0);
    f[58] = ratio(r.nodes.sets as f64, 20.0);
    f[59] = ratio(r.nodes.tuples as f64, 20.0);

    f[60] = 1.0 - (0.3 * clamp(f[1]) + 0.2 * clamp(f[2])).min(1.0);
    f[61] = 1.0 - (0.1 * clamp(f[0]) + 0.2 * clamp(f[40])).min(1.0);
    f[62] = clamp(f[0]) / ((chars / 1000.0).max(1.0) as f32);
    f[63] = (clamp(f[32]) + clamp(f[33])) / 10.0;

    for value in f.iter_mut() {
        *value = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    Observation::from(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
def total(values):
    result = 0
    for v in values:
        if v > 0:
            result += v
    return result

print(total([1, -2, 3]))
";

    #[test]
    fn test_empty_code_is_zero() {
        assert!(encode("", 1.0, 1.0).is_zero());
        assert!(encode("   \n\t", 1.0, 1.0).is_zero());
    }

    #[test]
    fn test_syntax_error_is_zero() {
        assert!(encode("def f(:\n", 1.0, 1.0).is_zero());
        assert!(encode("x = 'oops\n", 1.0, 1.0).is_zero());
    }

    #[test]
    fn test_invalid_python_encodes_to_zeros() {
        let snippets = [
            "def f(:\n    pass\n",
            "x = = 1\n",
            "return = 3\n",
            "x = 1 +\n",
            "for in range(3):\n    print(1)\n",
            "else:\n    pass\n",
            "import\n",
            "print(1 2)\n",
        ];
        for code in snippets {
            assert_eq!(encode(code, 1.0, 5.0), Observation::zeros(), "{:?}", code);
        }
    }

    #[test]
    fn test_all_features_in_unit_interval() {
        let obs = encode(SAMPLE, 25.0, 500.0);
        assert_eq!(obs.as_slice().len(), OBSERVATION_DIM);
        assert!(obs.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        // baseline metrics saturate
        assert_eq!(obs.get(14), 1.0);
        assert_eq!(obs.get(15), 1.0);
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(SAMPLE, 0.5, 3.0), encode(SAMPLE, 0.5, 3.0));
    }

    #[test]
    fn test_known_features() {
        let obs = encode(SAMPLE, 0.5, 3.0);
        assert!((obs.get(0) - 0.009).abs() < 1e-6);
        assert_eq!(obs.get(3), 0.0);
        assert!((obs.get(4) - 0.01).abs() < 1e-6);
        assert!((obs.get(14) - 0.05).abs() < 1e-6);
        assert!((obs.get(15) - 0.03).abs() < 1e-6);
        assert_eq!(obs.get(16), LINT_SCORE);
        assert_eq!(obs.get(17), TEST_PASS_RATIO);
        assert!((obs.get(18) - 0.02).abs() < 1e-6);
        assert_eq!(obs.get(24), obs.get(31));
    }

    #[test]
    fn test_flags_are_binary() {
        let code = "squares = [x * x for x in range(5)]\nf = lambda y: y\n";
        let obs = encode(code, 0.1, 1.0);
        assert_eq!(obs.get(48), 1.0);
        assert_eq!(obs.get(49), 0.0);
        assert_eq!(obs.get(50), 1.0);
        assert_eq!(obs.get(51), 0.0);
        for i in 48..52 {
            assert!(obs.get(i) == 0.0 || obs.get(i) == 1.0);
        }
    }

    #[test]
    fn test_recursion_flag() {
        let code = "def fact(n):\n    return 1 if n <= 1 else n * fact(n - 1)\n";
        assert_eq!(encode(code, 0.1, 1.0).get(3), 1.0);
    }
}
