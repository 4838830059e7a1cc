use std::fmt::{self, Display};

use schemars::{JsonSchema, schema_for};
use serde_json::{Map, Value, json};

/// The type a parameter value must have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// A JSON string.
    String,
    /// A number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
    /// Accepts any JSON value.
    Any,
}

impl ParamType {
    /// Parses a type name.
    ///
    /// JSON schema names are accepted, and so are the short names models
    /// tend to use (`str`, `int`, `float`, `bool`, `list`, `dict`).
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "string" | "str" => ParamType::String,
            "integer" | "int" => ParamType::Integer,
            "number" | "float" => ParamType::Number,
            "boolean" | "bool" => ParamType::Boolean,
            "array" | "list" => ParamType::Array,
            "object" | "dict" => ParamType::Object,
            "any" => ParamType::Any,
            _ => return None,
        };
        Some(ty)
    }

    /// Returns the JSON schema name of this type.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Any => "any",
        }
    }

    /// Reads the type out of a JSON schema node.
    ///
    /// Nullable types (`["string", "null"]`) resolve to the non-null type,
    /// anything the schema doesn't pin down resolves to `Any`.
    fn from_schema(node: &Value) -> Self {
        let name = match node.get("type") {
            Some(Value::String(name)) => Some(name.as_str()),
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .find(|name| *name != "null"),
            _ => None,
        };
        name.and_then(ParamType::parse).unwrap_or(ParamType::Any)
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one tool parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    /// The argument key.
    pub name: String,
    /// The type the value must have.
    pub ty: ParamType,
    /// Whether the argument must be present and not `null`.
    pub required: bool,
    /// Whether values of a neighbouring scalar type are converted instead
    /// of rejected (`"3"` for an integer, `3` for a string, and so on).
    pub coerce: bool,
    /// Shown to the model next to the type.
    pub description: Option<String>,
}

impl ParameterSpec {
    /// Declares a required parameter.
    #[inline]
    pub fn required<S: Into<String>>(name: S, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            coerce: false,
            description: None,
        }
    }

    /// Declares an optional parameter.
    #[inline]
    pub fn optional<S: Into<String>>(name: S, ty: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Allows scalar coercion for this parameter.
    #[inline]
    pub fn coercible(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Attaches a description shown to the model.
    #[inline]
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The declared interface of a tool: its name and ordered parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolSignature {
    /// Unique name the model calls the tool by.
    pub name: String,
    /// What the tool does, as told to the model.
    pub description: String,
    /// Declared parameters, in display order.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolSignature {
    /// Creates a signature without parameters.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        name: S1,
        description: S2,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: vec![],
        }
    }

    /// Derives a signature from the JSON schema of a tool input type.
    ///
    /// Only the top-level properties of an object schema become
    /// parameters. An input type without properties yields a signature that
    /// accepts no arguments.
    pub fn from_input<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let schema = schema_for!(T).to_value();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_else(Vec::new);

        let mut signature = Self::new(name, description);
        let properties =
            schema.get("properties").and_then(Value::as_object);
        let Some(properties) = properties else {
            return signature;
        };
        for (param_name, node) in properties {
            signature.parameters.push(ParameterSpec {
                name: param_name.clone(),
                ty: ParamType::from_schema(node),
                required: required.contains(&param_name.as_str()),
                coerce: false,
                description: node
                    .get("description")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned),
            });
        }
        signature
    }

    /// Adds a parameter, replacing any earlier one with the same name.
    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        match self.parameters.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.parameters.push(spec),
        }
        self
    }

    /// Allows scalar coercion for every parameter.
    pub fn with_coercion(mut self) -> Self {
        for spec in &mut self.parameters {
            spec.coerce = true;
        }
        self
    }

    /// Looks up a parameter by name.
    #[inline]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Returns the JSON form shown to the model.
    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.parameters {
            let mut property = Map::new();
            property.insert("type".to_owned(), json!(spec.ty.as_str()));
            if let Some(description) = &spec.description {
                property.insert("description".to_owned(), json!(description));
            }
            properties.insert(spec.name.clone(), Value::Object(property));
        }
        let required = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>();

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "properties": properties,
                "required": required,
            },
        })
    }
}
