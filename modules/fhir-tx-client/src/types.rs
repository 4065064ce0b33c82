use serde::Deserialize;

/// `ValueSet/$expand` response, reduced to the fields this client reads.
#[derive(Debug, Deserialize)]
pub struct ValueSetResponse {
    pub expansion: Expansion,
}

#[derive(Debug, Deserialize)]
pub struct Expansion {
    pub total: u64,
    #[serde(default)]
    pub contains: Vec<ExpansionCoding>,
}

#[derive(Debug, Deserialize)]
pub struct ExpansionCoding {
    pub code: String,
    #[serde(default)]
    pub display: String,
}

/// FHIR `Parameters` resource, the response shape of `$lookup` and
/// `$translate`.
#[derive(Debug, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub parameter: Vec<Parameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub value_string: Option<String>,
    pub value_boolean: Option<bool>,
    #[serde(default)]
    pub part: Vec<ParameterPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterPart {
    pub name: String,
    pub value_coding: Option<Coding>,
    pub value_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Coding {
    pub code: Option<String>,
    pub display: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expansion_with_codings() {
        let json = r#"{
            "resourceType": "ValueSet",
            "expansion": {
                "total": 2,
                "contains": [
                    {"system": "http://snomed.info/sct", "code": "195967001", "display": "Asthma"},
                    {"system": "http://snomed.info/sct", "code": "13645005"}
                ]
            }
        }"#;
        let vs: ValueSetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(vs.expansion.total, 2);
        assert_eq!(vs.expansion.contains.len(), 2);
        assert_eq!(vs.expansion.contains[0].display, "Asthma");
        assert_eq!(vs.expansion.contains[1].display, "");
    }

    #[test]
    fn parses_empty_expansion_without_contains() {
        let json = r#"{"expansion": {"total": 0}}"#;
        let vs: ValueSetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(vs.expansion.total, 0);
        assert!(vs.expansion.contains.is_empty());
    }

    #[test]
    fn parses_lookup_parameters() {
        let json = r#"{
            "resourceType": "Parameters",
            "parameter": [
                {"name": "name", "valueString": "SNOMED CT"},
                {"name": "display", "valueString": "Asthma (disorder)"}
            ]
        }"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        let display = params
            .parameter
            .iter()
            .find(|p| p.name == "display")
            .and_then(|p| p.value_string.as_deref());
        assert_eq!(display, Some("Asthma (disorder)"));
    }

    #[test]
    fn parses_translate_match_parts() {
        let json = r#"{
            "resourceType": "Parameters",
            "parameter": [
                {"name": "result", "valueBoolean": true},
                {
                    "name": "match",
                    "part": [
                        {"name": "equivalence", "valueString": "equal"},
                        {"name": "concept", "valueCoding": {"code": "840539006", "display": "COVID-19"}}
                    ]
                }
            ]
        }"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        let coding = params
            .parameter
            .iter()
            .filter(|p| p.name == "match")
            .flat_map(|p| p.part.iter())
            .find_map(|part| part.value_coding.as_ref())
            .unwrap();
        assert_eq!(coding.code.as_deref(), Some("840539006"));
    }
}
