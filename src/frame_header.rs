/// Frame parameters read from SOF0.
#[derive(Debug)]
pub(crate) struct FrameHeader {
    /// Y: number of lines in the source image.
    pub(crate) image_height: usize,

    /// X: number of samples per line.
    pub(crate) image_width: usize,

    pub(crate) components: Vec<FrameComponent>,
}

impl FrameHeader {
    /// Hmax and Vmax over all components; they size the MCU at
    /// (Hmax*8) x (Vmax*8) source pixels.
    pub(crate) fn max_sampling_factors(&self) -> (usize, usize) {
        let h = self
            .components
            .iter()
            .map(|c| c.horizontal_factor as usize)
            .max()
            .unwrap_or(1);
        let v = self
            .components
            .iter()
            .map(|c| c.vertical_factor as usize)
            .max()
            .unwrap_or(1);
        (h, v)
    }
}

/// One of the two-dimensional sample arrays which comprise the image.
#[derive(Debug, Clone)]
pub(crate) struct FrameComponent {
    /// Ci: unique label for this component; scan headers refer back to it.
    pub(crate) id: u8,

    /// Hi: number of horizontal data units of this component in each MCU.
    pub(crate) horizontal_factor: u8,

    /// Vi: number of vertical data units of this component in each MCU.
    pub(crate) vertical_factor: u8,

    /// Tqi: quantization table destination used when dequantizing this
    /// component's coefficients.
    pub(crate) quant_table_id: u8,

    /// Td: DC entropy table destination, assigned by the scan header.
    pub(crate) dc_table_id: u8,

    /// Ta: AC entropy table destination, assigned by the scan header.
    pub(crate) ac_table_id: u8,

    /// Running DC predictor; zero at the start of every scan.
    pub(crate) prev_dc: i32,
}

impl FrameComponent {
    pub(crate) fn from(id: u8, horizontal_factor: u8, vertical_factor: u8, quant_table_id: u8) -> Self {
        FrameComponent {
            id,
            horizontal_factor,
            vertical_factor,
            quant_table_id,
            dc_table_id: 0,
            ac_table_id: 0,
            prev_dc: 0,
        }
    }

    /// Data units this component contributes to each MCU.
    pub(crate) fn blocks_per_mcu(&self) -> usize {
        self.horizontal_factor as usize * self.vertical_factor as usize
    }
}
