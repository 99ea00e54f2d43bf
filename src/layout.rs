use crate::config::CompositionConfig;

pub const PHOTOS_PER_STRIP: usize = 4;

const EXPORT_COLUMNS: u32 = 2;

/// Supported photo grid shapes. Both hold four cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutChoice {
    /// 2x2 preview of portrait (3:4) cells.
    #[default]
    FourCut,
    /// Single-column preview of four landscape (4:3) cells.
    FourCutVertical,
}

impl LayoutChoice {
    pub fn all() -> &'static [LayoutChoice] {
        &[LayoutChoice::FourCut, LayoutChoice::FourCutVertical]
    }

    pub fn id(&self) -> &'static str {
        match self {
            LayoutChoice::FourCut => "4cut",
            LayoutChoice::FourCutVertical => "4cut-vertical",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|layout| layout.id() == id)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LayoutChoice::FourCut => "4-cut classic",
            LayoutChoice::FourCutVertical => "4-cut vertical strip",
        }
    }

    pub fn capacity(&self) -> usize {
        PHOTOS_PER_STRIP
    }

    /// (rows, columns) of the on-screen preview grid.
    pub fn preview_grid(&self) -> (u32, u32) {
        match self {
            LayoutChoice::FourCut => (2, 2),
            LayoutChoice::FourCutVertical => (4, 1),
        }
    }

    /// Width over height of one preview cell.
    pub fn preview_aspect(&self) -> f32 {
        match self {
            LayoutChoice::FourCut => 3.0 / 4.0,
            LayoutChoice::FourCutVertical => 4.0 / 3.0,
        }
    }

    /// (rows, columns) of the exported canvas. Every layout exports as a
    /// two-column grid of portrait cells.
    pub fn grid(&self) -> (u32, u32) {
        let rows = (self.capacity() as u32).div_ceil(EXPORT_COLUMNS);
        (rows, EXPORT_COLUMNS)
    }

    pub fn geometry(&self, config: &CompositionConfig) -> GridGeometry {
        let (rows, columns) = self.grid();
        let (cell_width, cell_height) = (config.cell_width, config.cell_height);
        GridGeometry {
            rows,
            columns,
            cell_width,
            cell_height,
            gap: config.gap,
            padding: config.padding,
            top_band: config.top_band,
            bottom_band: config.bottom_band,
        }
    }
}

impl std::fmt::Display for LayoutChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Pixel layout of the composed canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub rows: u32,
    pub columns: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub gap: u32,
    pub padding: u32,
    pub top_band: u32,
    pub bottom_band: u32,
}

impl GridGeometry {
    pub fn canvas_width(&self) -> u32 {
        self.columns * self.cell_width + self.columns.saturating_sub(1) * self.gap + self.padding * 2
    }

    pub fn canvas_height(&self) -> u32 {
        self.rows * self.cell_height
            + self.rows.saturating_sub(1) * self.gap
            + self.padding * 2
            + self.top_band
            + self.bottom_band
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width(), self.canvas_height())
    }

    /// Top-left corner of the cell holding photo `index`, filled row by row.
    pub fn cell_origin(&self, index: usize) -> Option<(u32, u32)> {
        let index = index as u32;
        if index >= self.rows * self.columns {
            return None;
        }
        let column = index % self.columns;
        let row = index / self.columns;
        Some((
            self.padding + column * (self.cell_width + self.gap),
            self.padding + self.top_band + row * (self.cell_height + self.gap),
        ))
    }

    /// Baseline of the logo inside the top band.
    pub fn logo_baseline(&self) -> u32 {
        self.padding + self.top_band.saturating_sub(25)
    }

    /// Baseline of the date stamp inside the bottom band.
    pub fn date_baseline(&self) -> u32 {
        self.canvas_height().saturating_sub(20)
    }
}
