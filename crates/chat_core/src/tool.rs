use serde::{Deserialize, Serialize};

/// A finalized tool call announced by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text as accumulated from the stream; parsed only at
    /// invocation time.
    pub arguments: String,
}

/// OpenAI-style function tool declaration sent in the request `tools` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_schema_serializes_with_type_field() {
        let schema = ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: "web_search".to_string(),
                description: "Search the web".to_string(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            },
        };

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "function");
        assert!(value.get("schema_type").is_none());
        assert_eq!(value["function"]["name"], "web_search");
    }

    #[test]
    fn tool_call_round_trips() {
        let call = ToolCall {
            id: "call_1".to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: "fetch_url".to_string(),
                arguments: r#"{"url":"https://example.com"}"#.to_string(),
            },
        };

        let json = serde_json::to_string(&call).unwrap();
        let back: ToolCall = serde_json::from_str(&json).unwrap();
        assert_eq!(back, call);
        assert!(json.contains(r#""type":"function""#));
    }
}
