use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Map2, Real};

/// Wavelength assumed when the acquisition did not record one (635 nm).
pub const DEFAULT_WAVELENGTH_M: Real = 635e-9;

/// Recorded interferogram stack `[step][image]` of `rows × cols` frames.
///
/// Immutable once constructed: every step holds the same number of exposures
/// and every frame has the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StackData", into = "StackData")]
pub struct InterferogramStack {
    frames: Vec<Vec<Map2>>,
    rows: usize,
    cols: usize,
    setpoints: Vec<Real>,
    process_values: Vec<Real>,
    timestamps: Vec<Vec<Real>>,
    wavelength_m: Real,
    filename: String,
}

/// Serialized form of [`InterferogramStack`]; validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackData {
    pub frames: Vec<Vec<Map2>>,
    #[serde(default)]
    pub setpoints: Vec<Real>,
    #[serde(default)]
    pub process_values: Vec<Real>,
    #[serde(default)]
    pub timestamps: Vec<Vec<Real>>,
    #[serde(default = "default_wavelength")]
    pub wavelength_m: Real,
    #[serde(default)]
    pub filename: String,
}

fn default_wavelength() -> Real {
    DEFAULT_WAVELENGTH_M
}

impl InterferogramStack {
    /// Build a stack from `frames[step][image]`.
    ///
    /// Fails with a data error when there are no steps, when steps hold
    /// different numbers of exposures, or when frame shapes differ.
    pub fn new(frames: Vec<Vec<Map2>>) -> Result<Self, AnalysisError> {
        if frames.is_empty() {
            return Err(AnalysisError::EmptyStack);
        }

        let images = frames[0].len();
        let (rows, cols) = frames
            .iter()
            .flat_map(|step| step.first())
            .map(|f| f.shape())
            .next()
            .unwrap_or((0, 0));

        for (step, exposures) in frames.iter().enumerate() {
            if exposures.len() != images {
                return Err(AnalysisError::InconsistentStack {
                    step,
                    detail: format!("{} exposures, expected {}", exposures.len(), images),
                });
            }
            for (image, frame) in exposures.iter().enumerate() {
                if frame.shape() != (rows, cols) {
                    return Err(AnalysisError::InconsistentStack {
                        step,
                        detail: format!(
                            "frame {} is {}x{}, expected {}x{}",
                            image,
                            frame.nrows(),
                            frame.ncols(),
                            rows,
                            cols
                        ),
                    });
                }
            }
        }

        Ok(Self {
            frames,
            rows,
            cols,
            setpoints: Vec::new(),
            process_values: Vec::new(),
            timestamps: Vec::new(),
            wavelength_m: DEFAULT_WAVELENGTH_M,
            filename: String::new(),
        })
    }

    pub fn with_wavelength(mut self, wavelength_m: Real) -> Self {
        self.wavelength_m = wavelength_m;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Attach per-step piezo setpoints and measured process values.
    pub fn with_piezo_record(mut self, setpoints: Vec<Real>, process_values: Vec<Real>) -> Self {
        self.setpoints = setpoints;
        self.process_values = process_values;
        self
    }

    /// Attach per-exposure timestamps `[step][image]`.
    pub fn with_timestamps(mut self, timestamps: Vec<Vec<Real>>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Number of stored phase steps `S`.
    pub fn step_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of exposures per step `N`.
    pub fn images_per_step(&self) -> usize {
        self.frames[0].len()
    }

    /// Frame shape `(rows, cols)`.
    pub fn frame_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn frame(&self, step: usize, image: usize) -> &Map2 {
        &self.frames[step][image]
    }

    /// All exposures recorded at `step`.
    pub fn step_frames(&self, step: usize) -> &[Map2] {
        &self.frames[step]
    }

    pub fn setpoints(&self) -> &[Real] {
        &self.setpoints
    }

    pub fn process_values(&self) -> &[Real] {
        &self.process_values
    }

    pub fn timestamps(&self) -> &[Vec<Real>] {
        &self.timestamps
    }

    pub fn wavelength_m(&self) -> Real {
        self.wavelength_m
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl TryFrom<StackData> for InterferogramStack {
    type Error = AnalysisError;

    fn try_from(data: StackData) -> Result<Self, Self::Error> {
        Ok(InterferogramStack::new(data.frames)?
            .with_wavelength(data.wavelength_m)
            .with_filename(data.filename)
            .with_piezo_record(data.setpoints, data.process_values)
            .with_timestamps(data.timestamps))
    }
}

impl From<InterferogramStack> for StackData {
    fn from(stack: InterferogramStack) -> Self {
        StackData {
            frames: stack.frames,
            setpoints: stack.setpoints,
            process_values: stack.process_values,
            timestamps: stack.timestamps,
            wavelength_m: stack.wavelength_m,
            filename: stack.filename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn frames(steps: usize, images: usize, rows: usize, cols: usize) -> Vec<Vec<Map2>> {
        (0..steps)
            .map(|s| {
                (0..images)
                    .map(|i| Map2::from_element(rows, cols, (s * 10 + i) as Real))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn stack_reports_dimensions() {
        let stack = InterferogramStack::new(frames(5, 3, 4, 6))
            .unwrap()
            .with_filename("20170623T145259_interferograms.hdf5");
        assert_eq!(stack.step_count(), 5);
        assert_eq!(stack.images_per_step(), 3);
        assert_eq!(stack.frame_shape(), (4, 6));
        assert_eq!(stack.frame(2, 1)[(0, 0)], 21.0);
        assert_eq!(stack.wavelength_m(), DEFAULT_WAVELENGTH_M);
    }

    #[test]
    fn ragged_stack_is_rejected() {
        let mut f = frames(5, 2, 4, 4);
        f[3].pop();
        let err = InterferogramStack::new(f).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let mut f = frames(5, 2, 4, 4);
        f[1][1] = Map2::zeros(4, 5);
        assert!(matches!(
            InterferogramStack::new(f),
            Err(AnalysisError::InconsistentStack { step: 1, .. })
        ));

        assert_eq!(
            InterferogramStack::new(Vec::new()).unwrap_err(),
            AnalysisError::EmptyStack
        );
    }

    #[test]
    fn stack_with_zero_exposures_is_representable() {
        let stack = InterferogramStack::new(vec![Vec::new(); 5]).unwrap();
        assert_eq!(stack.images_per_step(), 0);
        assert_eq!(stack.frame_shape(), (0, 0));
    }

    #[test]
    fn stack_json_roundtrip_validates() {
        let stack = InterferogramStack::new(frames(5, 1, 2, 3))
            .unwrap()
            .with_wavelength(632.8e-9)
            .with_piezo_record(vec![0.0, 0.1, 0.2, 0.3, 0.4], vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        let json = serde_json::to_string(&stack).unwrap();
        let de: InterferogramStack = serde_json::from_str(&json).unwrap();
        assert_eq!(de.frame_shape(), (2, 3));
        assert_eq!(de.setpoints().len(), 5);
        assert!((de.wavelength_m() - 632.8e-9).abs() < 1e-18);

        let mut raw: StackData = serde_json::from_str(&json).unwrap();
        raw.frames[4].clear();
        let bad = serde_json::to_string(&raw).unwrap();
        assert!(serde_json::from_str::<InterferogramStack>(&bad).is_err());
    }
}
