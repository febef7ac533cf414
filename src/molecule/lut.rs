//! Element and residue lookup tables.
//!
//! Van-der-Waals radii are stored in picometers keyed by lower-case element
//! name. Colors follow the CPK scheme for elements and the RasTop amino acid
//! scheme for residues.

use rustc_hash::FxHashMap;

use crate::error::SurfaceError;

/// Residue color used when a residue tag has no entry.
pub const DEFAULT_RESIDUE_COLOR: [f32; 3] =
    [0.745_098_04, 0.627_450_98, 0.431_372_55];

/// Element color used when an element tag has no entry.
pub const DEFAULT_ELEMENT_COLOR: [f32; 3] = [0.9, 0.5, 0.9];

const VDW_RADII_PICOMETER: &[(&str, u32)] = &[
    ("aluminium", 184),
    ("antimony", 206),
    ("argon", 188),
    ("arsenic", 185),
    ("astatine", 202),
    ("barium", 268),
    ("beryllium", 153),
    ("bismuth", 207),
    ("boron", 192),
    ("bromine", 185),
    ("cadmium", 158),
    ("caesium", 343),
    ("calcium", 231),
    ("carbon", 170),
    ("chlorine", 175),
    ("copper", 140),
    ("fluorine", 147),
    ("francium", 348),
    ("gallium", 187),
    ("germanium", 211),
    ("gold", 166),
    ("helium", 140),
    ("hydrogen", 120),
    ("indium", 193),
    ("iodine", 198),
    ("krypton", 202),
    ("lead", 202),
    ("magnesium", 173),
    ("mercury", 155),
    ("neon", 154),
    ("nickel", 163),
    ("nitrogen", 155),
    ("oxygen", 152),
    ("palladium", 163),
    ("phosphorus", 180),
    ("platinum", 175),
    ("polonium", 197),
    ("potassium", 275),
    ("radium", 283),
    ("radon", 220),
    ("rubidium", 303),
    ("scandium", 211),
    ("selenium", 190),
    ("silicon", 210),
    ("silver", 172),
    ("sodium", 227),
    ("strontium", 249),
    ("sulfur", 180),
    ("tellurium", 206),
    ("thallium", 196),
    ("tin", 217),
    ("uranium", 186),
    ("xenon", 216),
    ("zinc", 139),
];

const CPK_COLORS: &[(&str, [f32; 3])] = &[
    ("hydrogen", [1.0, 1.0, 1.0]),
    ("carbon", [0.0, 0.0, 0.0]),
    ("nitrogen", [0.5, 0.8, 1.0]),
    ("oxygen", [1.0, 0.0, 0.0]),
    ("fluorine", [0.0, 1.0, 0.0]),
    ("chlorine", [0.0, 1.0, 0.0]),
    ("bromine", [0.6, 0.2, 0.2]),
    ("iodine", [0.7, 0.2, 0.9]),
    ("phosphorus", [1.0, 0.5, 0.0]),
    ("sulfur", [1.0, 1.0, 0.0]),
    ("boron", [1.0, 0.9, 0.7]),
    ("titanium", [0.7, 0.7, 0.7]),
    ("iron", [0.8, 0.4, 0.1]),
];

// RasTop amino acid palette
const AMINO_COLORS: &[(&str, [f32; 3])] = &[
    ("ASP", [0.901_960_8, 0.901_960_8, 0.039_215_69]),
    ("GLU", [0.901_960_8, 0.901_960_8, 0.039_215_69]),
    ("CYS", [0.901_960_8, 0.901_960_8, 0.0]),
    ("MET", [0.901_960_8, 0.901_960_8, 0.0]),
    ("LYS", [0.078_431_37, 0.352_941_2, 1.0]),
    ("ARG", [0.078_431_37, 0.352_941_2, 1.0]),
    ("SER", [0.980_392_2, 0.588_235_3, 0.0]),
    ("THR", [0.980_392_2, 0.588_235_3, 0.0]),
    ("PHE", [0.196_078_43, 0.196_078_43, 0.666_666_7]),
    ("TYR", [0.196_078_43, 0.196_078_43, 0.666_666_7]),
    ("ASN", [0.0, 0.862_745_1, 0.862_745_1]),
    ("GLN", [0.0, 0.862_745_1, 0.862_745_1]),
    ("GLY", [0.921_568_6, 0.921_568_6, 0.921_568_6]),
    ("LEU", [0.058_823_53, 0.509_803_9, 0.058_823_53]),
    ("VAL", [0.058_823_53, 0.509_803_9, 0.058_823_53]),
    ("ILE", [0.058_823_53, 0.509_803_9, 0.058_823_53]),
    ("ALA", [0.784_313_74, 0.784_313_74, 0.784_313_74]),
    ("TRP", [0.705_882_4, 0.352_941_2, 0.705_882_4]),
    ("HIS", [0.509_803_9, 0.509_803_9, 0.823_529_4]),
    ("PRO", [0.862_745_1, 0.588_235_3, 0.509_803_9]),
];

/// Radius and color lookup keyed by element name or residue code.
pub struct AtomLut {
    radii: FxHashMap<&'static str, u32>,
    element_colors: FxHashMap<&'static str, [f32; 3]>,
    amino_colors: FxHashMap<&'static str, [f32; 3]>,
}

impl Default for AtomLut {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomLut {
    /// Build the tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            radii: VDW_RADII_PICOMETER.iter().copied().collect(),
            element_colors: CPK_COLORS.iter().copied().collect(),
            amino_colors: AMINO_COLORS.iter().copied().collect(),
        }
    }

    /// Van-der-Waals radius in picometers, if the element is known.
    #[must_use]
    pub fn radius_picometer(&self, element: &str) -> Option<u32> {
        self.radii.get(element).copied()
    }

    /// Van-der-Waals radius in angstrom.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::UnknownElement`] when the element has no
    /// radius entry.
    pub fn radius_angstrom(&self, element: &str) -> Result<f32, SurfaceError> {
        self.radius_picometer(element)
            .map(|pm| pm as f32 / 100.0)
            .ok_or_else(|| SurfaceError::UnknownElement(element.to_owned()))
    }

    /// CPK color of an element, [`DEFAULT_ELEMENT_COLOR`] when unknown.
    #[must_use]
    pub fn element_color(&self, element: &str) -> [f32; 3] {
        self.element_colors
            .get(element)
            .copied()
            .unwrap_or(DEFAULT_ELEMENT_COLOR)
    }

    /// Residue color, [`DEFAULT_RESIDUE_COLOR`] when unknown.
    #[must_use]
    pub fn residue_color(&self, residue: &str) -> [f32; 3] {
        self.amino_colors
            .get(residue)
            .copied()
            .unwrap_or(DEFAULT_RESIDUE_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carbon_radius_in_angstrom() {
        let lut = AtomLut::new();
        assert_eq!(lut.radius_picometer("carbon"), Some(170));
        assert!((lut.radius_angstrom("carbon").unwrap() - 1.7).abs() < 1e-6);
    }

    #[test]
    fn unknown_element_fails_fast() {
        let lut = AtomLut::new();
        assert!(matches!(
            lut.radius_angstrom("unobtainium"),
            Err(SurfaceError::UnknownElement(name)) if name == "unobtainium"
        ));
    }

    #[test]
    fn color_fallbacks() {
        let lut = AtomLut::new();
        assert_eq!(lut.residue_color("HOH"), DEFAULT_RESIDUE_COLOR);
        assert_eq!(lut.residue_color("LYS"), lut.residue_color("ARG"));
        assert_eq!(lut.element_color("oxygen"), [1.0, 0.0, 0.0]);
        assert_eq!(lut.element_color("xenon"), DEFAULT_ELEMENT_COLOR);
    }
}
