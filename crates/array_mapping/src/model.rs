use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Ordered, named rules. Rules are resolved in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSpec {
    rules: Vec<(String, Rule)>,
}

impl MappingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, key: impl Into<String>, rule: Rule) -> Self {
        self.push(key, rule);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, rule: Rule) {
        self.rules.push((key.into(), rule));
    }

    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(key, rule)| (key.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Rule)> for MappingSpec {
    fn from_iter<I: IntoIterator<Item = (K, Rule)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().map(|(key, rule)| (key.into(), rule)).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub from: Option<String>,
    pub to: String,
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "deserialize_dependencies")]
    pub dependencies: Option<Vec<String>>,
    pub function: Option<FunctionCall>,
}

impl Rule {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ..Self::default()
        }
    }

    pub fn source(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn default_value(mut self, value: JsonValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn depends_on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn computed<I, S>(mut self, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.function = Some(FunctionCall {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Rule keys may be written as strings or integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleKey {
    Text(String),
    Int(i64),
}

impl From<RuleKey> for String {
    fn from(key: RuleKey) -> Self {
        match key {
            RuleKey::Text(text) => text,
            RuleKey::Int(value) => value.to_string(),
        }
    }
}

fn deserialize_dependencies<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let keys: Option<Vec<RuleKey>> = Option::deserialize(deserializer)?;
    Ok(keys.map(|keys| keys.into_iter().map(String::from).collect()))
}

impl<'de> Deserialize<'de> for MappingSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MappingSpecVisitor)
    }
}

struct MappingSpecVisitor;

impl<'de> Visitor<'de> for MappingSpecVisitor {
    type Value = MappingSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of rule keys to rules, or a sequence of rules")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut spec = MappingSpec::new();
        while let Some((key, rule)) = map.next_entry::<RuleKey, Rule>()? {
            let key = String::from(key);
            if spec.get(&key).is_some() {
                return Err(de::Error::custom(format!("duplicate rule key '{}'", key)));
            }
            spec.push(key, rule);
        }
        Ok(spec)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut spec = MappingSpec::new();
        while let Some(rule) = seq.next_element::<Rule>()? {
            let key = spec.len().to_string();
            spec.push(key, rule);
        }
        Ok(spec)
    }
}
