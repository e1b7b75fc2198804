mod output;

pub use output::{
    display_content, display_decision, display_error, display_notice, display_tool_error,
    display_tool_result,
};
