/// 膝角度の離散状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KneeState {
    Up,
    Middle,
    Down,
}

impl KneeState {
    pub const ALL: [KneeState; 3] = [KneeState::Up, KneeState::Middle, KneeState::Down];
}

/// この角度未満なら down (度)
pub const DOWN_ANGLE: f32 = 73.0;
/// この角度を超えたら up (度)
pub const UP_ANGLE: f32 = 170.0;

/// 膝角度の離散化しきい値（度）
///
/// デプロイ単位で調整可能。フレーム単位では固定。
/// 常に down < up。
#[derive(Debug, Clone, Copy)]
pub struct KneeThresholds {
    pub down: f32,
    pub up: f32,
}

impl KneeThresholds {
    pub fn new(down: f32, up: f32) -> Self {
        debug_assert!(down < up, "down threshold must be below up threshold");
        Self { down, up }
    }

    /// 連続角度(度)を3値に離散化する
    ///
    /// down境界・up境界ちょうどはmiddle扱い。
    pub fn discretize(&self, angle: f32) -> KneeState {
        if angle < self.down {
            KneeState::Down
        } else if angle > self.up {
            KneeState::Up
        } else {
            KneeState::Middle
        }
    }
}

impl Default for KneeThresholds {
    fn default() -> Self {
        Self {
            down: DOWN_ANGLE,
            up: UP_ANGLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discretize_down() {
        let t = KneeThresholds::default();
        assert_eq!(t.discretize(0.0), KneeState::Down);
        assert_eq!(t.discretize(72.9), KneeState::Down);
        assert_eq!(t.discretize(-10.0), KneeState::Down);
    }

    #[test]
    fn test_discretize_up() {
        let t = KneeThresholds::default();
        assert_eq!(t.discretize(170.1), KneeState::Up);
        assert_eq!(t.discretize(180.0), KneeState::Up);
    }

    #[test]
    fn test_discretize_middle() {
        let t = KneeThresholds::default();
        assert_eq!(t.discretize(73.0), KneeState::Middle);
        assert_eq!(t.discretize(120.0), KneeState::Middle);
        assert_eq!(t.discretize(170.0), KneeState::Middle);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = KneeThresholds::new(90.0, 160.0);
        assert_eq!(t.discretize(89.9), KneeState::Down);
        assert_eq!(t.discretize(90.0), KneeState::Middle);
        assert_eq!(t.discretize(160.1), KneeState::Up);
    }
}
