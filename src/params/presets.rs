use crate::store::VoiceParameterSet;

/// A built-in, read-only parameter template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetDefinition {
    pub name: &'static str,
    pub values: &'static [(&'static str, &'static str)],
}

impl PresetDefinition {
    pub fn to_set(&self) -> VoiceParameterSet {
        self.values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

macro_rules! preset {
    ($name:literal: $bas:literal, $spd:literal, $vol:literal, $pit:literal, $acc:literal, $lmd:literal, $fsc:literal) => {
        PresetDefinition {
            name: $name,
            values: &[
                ("bas", $bas),
                ("spd", $spd),
                ("vol", $vol),
                ("pit", $pit),
                ("acc", $acc),
                ("lmd", $lmd),
                ("fsc", $fsc),
            ],
        }
    };
}

//                        bas  spd    vol    pit    acc    lmd    fsc
pub const PRESETS: &[PresetDefinition] = &[
    preset!("F1": "0", "100", "100", "100", "100", "100", "100"),
    preset!("F2": "1", "100", "100", "77", "150", "100", "100"),
    preset!("F3": "0", "80", "100", "100", "100", "61", "148"),
    preset!("M1": "2", "100", "100", "30", "100", "100", "100"),
    preset!("M2": "2", "105", "100", "45", "130", "120", "100"),
    preset!("R1": "2", "100", "100", "30", "20", "190", "100"),
    preset!("R2": "1", "70", "100", "50", "50", "50", "180"),
];

/// Case-sensitive lookup by preset name.
pub fn find_preset(name: &str) -> Option<&'static PresetDefinition> {
    PRESETS.iter().find(|p| p.name == name)
}
