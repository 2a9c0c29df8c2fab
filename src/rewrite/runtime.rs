//! Runtime-support code injected into every rewritten file.
//!
//! The preamble is a single line with no newline, glued in front of the
//! original line 0, so line numbers in the rewritten file match the input.
//! Every snippet the rewriter splices in must stay newline-free for the
//! same reason.

/// Constructor of the "no-result" sentinel. Its accessor is not callable.
pub const NONE_FN: &str = "__rfjs_none";

/// Constructor of the "has-result" sentinel wrapping a captured value.
pub const RESULT_FN: &str = "__rfjs_res";

/// Turns any value into a zero-argument accessor, unwrapping sentinels.
pub const WRAP_FN: &str = "__rfjs_wrap";

/// Temporary holding the value of a split function's core body.
pub const RESULT_VAR: &str = "__rfjs_result";

/// Invocation of a generated wrapper inside a non-arrow function, keeping
/// its `this` and `arguments`.
pub const INVOKE_APPLY: &str = ".apply(this, arguments)";

/// Invocation of a generated wrapper where no `arguments` binding exists.
pub const INVOKE_CALL: &str = ".call(this)";

/// Prefix of analyzer directives, which are never wrapped.
pub const DIRECTIVE_PREFIX: &str = "TAJS_";

/// Defines the three helper routines and tells the analyzer to track them
/// context-sensitively.
pub const PREAMBLE: &str = concat!(
    "TAJS_makeContextSensitive(__rfjs_res,0);",
    "TAJS_makeContextSensitive(__rfjs_wrap,0);",
    "function __rfjs_none(){var ret=TAJS_newObject();ret.__rfjs_s=true;ret.__rfjs_r=0;return ret;}",
    "function __rfjs_res(y){TAJS_addContextSensitivity('y');var ret=TAJS_newObject();",
    "ret.__rfjs_s=true;ret.__rfjs_r=function(){return y;};return ret;}",
    "function __rfjs_wrap(x){TAJS_addContextSensitivity('x');",
    "if(typeof(x)==\"object\"&&x!==null&&x.__rfjs_s){return x.__rfjs_r;}",
    "return function(){return x;};}",
);

/// Appended after the last byte of the original source.
pub const TRAILER: &str = "\n// rfjs: generated file, do not edit\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_is_single_line() {
        assert!(!PREAMBLE.contains('\n'));
    }

    #[test]
    fn test_preamble_defines_helpers() {
        for name in [NONE_FN, RESULT_FN, WRAP_FN] {
            assert!(
                PREAMBLE.contains(&format!("function {}(", name)),
                "preamble is missing {}",
                name
            );
        }
    }
}
