use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Arguments for one tool invocation, normalized to the `(args, kwargs)`
/// convention every handler receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolInput {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl ToolInput {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { args, kwargs }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Normalize whatever the caller sent.
    ///
    /// An object carrying `args`/`kwargs` is an envelope and only those keys are
    /// used. Any other object is taken as keyword values, an array as
    /// positional values, and a lone scalar as the single positional value.
    /// Strings holding valid JSON are parsed first, both for the whole payload
    /// and for each individual value.
    pub fn from_arguments(raw: Option<&Value>) -> Self {
        let raw = match raw {
            None | Some(Value::Null) => return Self::default(),
            Some(value) => parse_json_string(value.clone()),
        };

        let (args, kwargs) = match raw {
            Value::Object(map) if map.contains_key("args") || map.contains_key("kwargs") => {
                let envelope_only = map.keys().all(|k| k == "args" || k == "kwargs");
                if !envelope_only {
                    tracing::debug!("ignoring keys outside the args/kwargs envelope");
                }
                (map.get("args").cloned(), map.get("kwargs").cloned())
            }
            Value::Object(map) if map.is_empty() => (None, None),
            Value::Object(map) => (None, Some(Value::Object(map))),
            Value::Array(items) => (Some(Value::Array(items)), None),
            Value::Null => (None, None),
            scalar => (Some(scalar), None),
        };

        Self {
            args: coerce_args(args),
            kwargs: coerce_kwargs(kwargs),
        }
    }

    /// Value of a parameter given by keyword or at `index` positionally
    pub fn arg(&self, index: usize, name: &str) -> Option<&Value> {
        self.kwargs.get(name).or_else(|| self.args.get(index))
    }

    /// Bind positional values to `params` in order, then merge keyword
    /// values. Rejects surplus positionals, unknown keywords and parameters
    /// given twice.
    pub fn bind(&self, params: &[&str]) -> Result<Map<String, Value>, String> {
        if self.args.len() > params.len() {
            return Err(format!(
                "expected at most {} positional argument(s), got {}",
                params.len(),
                self.args.len()
            ));
        }

        let mut bound = Map::new();
        for (name, value) in params.iter().zip(&self.args) {
            bound.insert(name.to_string(), value.clone());
        }

        for (key, value) in &self.kwargs {
            if !params.contains(&key.as_str()) {
                return Err(format!("unexpected keyword argument '{}'", key));
            }
            if bound.contains_key(key) {
                return Err(format!("got multiple values for argument '{}'", key));
            }
            bound.insert(key.clone(), value.clone());
        }

        Ok(bound)
    }

    /// [`ToolInput::bind`] followed by deserialization into `T`
    pub fn bind_into<T: DeserializeOwned>(&self, params: &[&str]) -> Result<T, String> {
        let bound = self.bind(params)?;
        serde_json::from_value(Value::Object(bound))
            .map_err(|e| format!("invalid arguments: {}", e))
    }
}

fn parse_json_string(value: Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

fn coerce_args(args: Option<Value>) -> Vec<Value> {
    match args.map(parse_json_string) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().map(parse_json_string).collect(),
        Some(single) => vec![single],
    }
}

fn coerce_kwargs(kwargs: Option<Value>) -> Map<String, Value> {
    match kwargs.map(parse_json_string) {
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| (k, parse_json_string(v)))
            .collect(),
        _ => Map::new(),
    }
}
