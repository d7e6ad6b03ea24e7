use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum TransformationType {
    Insert,
    Replace,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum TransformationReason {
    CallProtection,
    Auxdata,
    Constructor,
    Immutable,
    Library,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    r#type: TransformationType,
    reason: TransformationReason,
    offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl From<Transformation> for serde_json::Value {
    fn from(value: Transformation) -> Self {
        serde_json::to_value(value).expect("transformations serialization must succeed")
    }
}

/// Emission order fixed by the matcher: callProtection, then immutables,
/// then libraries, then auxdata, then constructorArguments. Ties on offset
/// are broken by this same order.
impl Transformation {
    pub fn call_protection(offset: usize) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::CallProtection,
            offset,
            id: None,
        }
    }

    pub fn immutable(offset: usize, id: impl Into<String>) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::Immutable,
            offset,
            id: Some(id.into()),
        }
    }

    pub fn library(offset: usize, id: impl Into<String>) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::Library,
            offset,
            id: Some(id.into()),
        }
    }

    pub fn auxdata(offset: usize, id: impl Into<String>) -> Self {
        Self {
            r#type: TransformationType::Replace,
            reason: TransformationReason::Auxdata,
            offset,
            id: Some(id.into()),
        }
    }

    pub fn constructor(offset: usize) -> Self {
        Self {
            r#type: TransformationType::Insert,
            reason: TransformationReason::Constructor,
            offset,
            id: None,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Position in the fixed emission order; used to sort transformations
    /// and to break ties when two reasons land on the same offset.
    fn reason_rank(&self) -> u8 {
        match self.reason {
            TransformationReason::CallProtection => 0,
            TransformationReason::Immutable => 1,
            TransformationReason::Library => 2,
            TransformationReason::Auxdata => 3,
            TransformationReason::Constructor => 4,
        }
    }
}

impl PartialOrd for Transformation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transformation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.reason_rank()
            .cmp(&other.reason_rank())
            .then(self.offset.cmp(&other.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_order_matches_reason_then_offset() {
        let mut transformations = vec![
            Transformation::constructor(100),
            Transformation::auxdata(50, "1"),
            Transformation::library(10, "A.sol:Lib"),
            Transformation::call_protection(1),
            Transformation::immutable(20, "5"),
        ];
        transformations.sort();

        let reasons: Vec<_> = transformations
            .iter()
            .map(|t| serde_json::to_value(t).unwrap()["reason"].clone())
            .collect();
        assert_eq!(
            reasons,
            vec!["callProtection", "immutable", "library", "auxdata", "constructor"]
        );
    }
}
