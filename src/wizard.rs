use crate::filter::FilterDefinition;
use crate::layout::LayoutChoice;
use crate::theme::FrameTheme;

/// Screens of the booth, in the order the user walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Landing,
    Camera,
    Layout,
    Filter,
    Capture,
    Result,
}

impl Step {
    /// Steps that show the live preview.
    pub fn needs_camera(&self) -> bool {
        matches!(self, Step::Camera | Step::Layout | Step::Filter | Step::Capture)
    }

    /// Position in the step indicator. The landing screen has none.
    pub fn progress_index(&self) -> Option<usize> {
        match self {
            Step::Landing => None,
            Step::Camera => Some(0),
            Step::Layout => Some(1),
            Step::Filter => Some(2),
            Step::Capture => Some(3),
            Step::Result => Some(4),
        }
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Landing => Some(Step::Camera),
            Step::Camera => Some(Step::Layout),
            Step::Layout => Some(Step::Filter),
            Step::Filter => Some(Step::Capture),
            Step::Capture => Some(Step::Result),
            Step::Result => None,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Landing => "landing",
            Step::Camera => "camera",
            Step::Layout => "layout",
            Step::Filter => "filter",
            Step::Capture => "capture",
            Step::Result => "result",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraTransition {
    Acquire,
    Release,
    Keep,
}

/// Side effects a step change asks of the booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Step,
    pub to: Step,
    pub camera: CameraTransition,
    pub reset_photos: bool,
}

/// Current step plus the user's layout, filter and theme choices.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: Step,
    layout: LayoutChoice,
    filter: &'static FilterDefinition,
    theme: FrameTheme,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(LayoutChoice::default(), FilterDefinition::none(), FrameTheme::default_theme())
    }
}

impl Wizard {
    pub fn new(layout: LayoutChoice, filter: &'static FilterDefinition, theme: FrameTheme) -> Self {
        Self {
            step: Step::Landing,
            layout,
            filter,
            theme,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn layout(&self) -> LayoutChoice {
        self.layout
    }

    pub fn filter(&self) -> &'static FilterDefinition {
        self.filter
    }

    pub fn theme(&self) -> &FrameTheme {
        &self.theme
    }

    pub fn select_layout(&mut self, layout: LayoutChoice) {
        self.layout = layout;
    }

    pub fn select_filter(&mut self, filter: &'static FilterDefinition) {
        self.filter = filter;
    }

    pub fn select_theme(&mut self, theme: FrameTheme) {
        self.theme = theme;
    }

    /// Move to `to`. The camera is acquired only when entering the preview
    /// steps and released only when leaving them, so moving between two
    /// preview steps keeps the same stream.
    pub fn goto(&mut self, to: Step) -> Transition {
        let from = self.step;
        self.step = to;

        let camera = match (from.needs_camera(), to.needs_camera()) {
            (false, true) => CameraTransition::Acquire,
            (true, false) => CameraTransition::Release,
            _ => CameraTransition::Keep,
        };
        // Stepping back out of capture discards the shots
        let reset_photos = from == Step::Capture && to < Step::Capture;

        log::debug!("Step {} -> {} (camera {:?})", from, to, camera);
        Transition { from, to, camera, reset_photos }
    }

    /// Back to the landing screen with a fresh filter choice.
    pub fn start_over(&mut self) -> Transition {
        self.filter = FilterDefinition::none();
        let mut transition = self.goto(Step::Landing);
        transition.reset_photos = true;
        transition
    }
}
