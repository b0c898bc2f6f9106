//! Named preload stages and the resource names they expand to.
//!
//! Leaf stages expand to one batch of logical names. Composite stages are
//! only an ordered list of other stages.

use std::fmt;

/// Icon categories with sprite sheets under `icons/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconType {
    Cube,
    Ship,
    Ball,
    Ufo,
    Wave,
    Robot,
    Spider,
    Swing,
    Jetpack,
}

impl IconType {
    /// File name prefix of the category's sheets.
    pub fn prefix(&self) -> &'static str {
        match self {
            IconType::Cube => "player",
            IconType::Ship => "ship",
            IconType::Ball => "player_ball",
            IconType::Ufo => "bird",
            IconType::Wave => "dart",
            IconType::Robot => "robot",
            IconType::Spider => "spider",
            IconType::Swing => "swing",
            IconType::Jetpack => "jetpack",
        }
    }

    /// Logical name of one icon's sheet, e.g. `icons/player_01`.
    pub fn sheet_name(&self, id: u32) -> String {
        format!("icons/{}_{:02}", self.prefix(), id)
    }
}

/// Inclusive range of icon ids in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconRange {
    pub icon_type: IconType,
    pub start: u32,
    pub end: u32,
}

impl IconRange {
    pub const fn new(icon_type: IconType, start: u32, end: u32) -> Self {
        Self {
            icon_type,
            start,
            end,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        (self.start..=self.end).map(|id| self.icon_type.sheet_name(id))
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Death effect sheets, `PlayerExplosion_01` through `PlayerExplosion_19`.
pub const DEATH_EFFECT_IDS: std::ops::Range<u32> = 1..20;

/// Logical name of a death effect sheet.
pub fn death_effect_name(id: u32) -> String {
    format!("PlayerExplosion_{:02}", id)
}

// The last ship (169) is left out on purpose: loading it breaks mini icons
// in the host.
const CUBE: IconRange = IconRange::new(IconType::Cube, 0, 485);
const SHIP: IconRange = IconRange::new(IconType::Ship, 1, 168);
const BALL: IconRange = IconRange::new(IconType::Ball, 0, 118);
const UFO: IconRange = IconRange::new(IconType::Ufo, 1, 149);
const WAVE: IconRange = IconRange::new(IconType::Wave, 1, 96);
const OTHER: [IconRange; 4] = [
    IconRange::new(IconType::Robot, 1, 68),
    IconRange::new(IconType::Spider, 1, 69),
    IconRange::new(IconType::Swing, 1, 43),
    IconRange::new(IconType::Jetpack, 1, 8),
];

/// What running a stage means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePlan {
    /// Load these logical names as one batch
    Batch(Vec<String>),
    /// Run these stages in order
    Composite(Vec<AssetPreloadStage>),
}

/// A named unit of preloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetPreloadStage {
    DeathEffect,
    Cube,
    Ship,
    Ball,
    Ufo,
    Wave,
    Other,
    AllWithoutDeathEffects,
    All,
}

impl AssetPreloadStage {
    /// Every stage, leaves first.
    pub fn all() -> &'static [AssetPreloadStage] {
        &[
            AssetPreloadStage::DeathEffect,
            AssetPreloadStage::Cube,
            AssetPreloadStage::Ship,
            AssetPreloadStage::Ball,
            AssetPreloadStage::Ufo,
            AssetPreloadStage::Wave,
            AssetPreloadStage::Other,
            AssetPreloadStage::AllWithoutDeathEffects,
            AssetPreloadStage::All,
        ]
    }

    /// Command line name.
    pub fn name(&self) -> &'static str {
        match self {
            AssetPreloadStage::DeathEffect => "death-effect",
            AssetPreloadStage::Cube => "cube",
            AssetPreloadStage::Ship => "ship",
            AssetPreloadStage::Ball => "ball",
            AssetPreloadStage::Ufo => "ufo",
            AssetPreloadStage::Wave => "wave",
            AssetPreloadStage::Other => "other",
            AssetPreloadStage::AllWithoutDeathEffects => "all-without-death-effects",
            AssetPreloadStage::All => "all",
        }
    }

    /// Look a stage up by its command line name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|stage| stage.name().eq_ignore_ascii_case(name))
    }

    pub fn plan(&self) -> StagePlan {
        use AssetPreloadStage::*;

        match self {
            DeathEffect => StagePlan::Batch(DEATH_EFFECT_IDS.map(death_effect_name).collect()),
            Cube => StagePlan::Batch(CUBE.names().collect()),
            Ship => StagePlan::Batch(SHIP.names().collect()),
            Ball => StagePlan::Batch(BALL.names().collect()),
            Ufo => StagePlan::Batch(UFO.names().collect()),
            Wave => StagePlan::Batch(WAVE.names().collect()),
            Other => StagePlan::Batch(OTHER.iter().flat_map(IconRange::names).collect()),
            AllWithoutDeathEffects => {
                StagePlan::Composite(vec![Cube, Ship, Ball, Ufo, Wave, Other])
            }
            All => StagePlan::Composite(vec![DeathEffect, AllWithoutDeathEffects]),
        }
    }
}

impl fmt::Display for AssetPreloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
