use serde::{Deserialize, Serialize};
use std::fmt;

use super::knee::KneeState;

/// スクワット1サイクル内の進行状態
///
/// 遷移は5本のエッジのみ:
/// start --up--> up --middle--> descending --down--> down
/// --middle--> ascending --up--> up (レップ完了)
///
/// それ以外の(状態, 膝入力)の組はすべて自己ループ。
/// ワイヤ上は小文字文字列 ("start", "up", ...) で表現される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SquatState {
    Start,
    Up,
    Descending,
    Down,
    Ascending,
}

impl SquatState {
    pub const ALL: [SquatState; 5] = [
        SquatState::Start,
        SquatState::Up,
        SquatState::Descending,
        SquatState::Down,
        SquatState::Ascending,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SquatState::Start => "start",
            SquatState::Up => "up",
            SquatState::Descending => "descending",
            SquatState::Down => "down",
            SquatState::Ascending => "ascending",
        }
    }

    /// 膝状態を1つ消費して次状態を返す
    ///
    /// 戻り値の bool はレップ完了 (ascending→up の遷移のみ true)。
    /// どの入力でもエラーにはならない。表にない組は (self, false)。
    pub fn advance(self, knee: KneeState) -> (SquatState, bool) {
        match (self, knee) {
            (SquatState::Start, KneeState::Up) => (SquatState::Up, false),
            (SquatState::Up, KneeState::Middle) => (SquatState::Descending, false),
            (SquatState::Descending, KneeState::Down) => (SquatState::Down, false),
            (SquatState::Down, KneeState::Middle) => (SquatState::Ascending, false),
            (SquatState::Ascending, KneeState::Up) => (SquatState::Up, true),
            _ => (self, false),
        }
    }

    /// nextが1ステップで到達可能か（自己ループ含む）
    ///
    /// ネットワーク越しに返ってきた状態の検証に使う。順序が入れ替わって
    /// 届いた古い結果はここで弾かれる。
    pub fn can_follow(self, next: SquatState) -> bool {
        if next == self {
            return true;
        }
        matches!(
            (self, next),
            (SquatState::Start, SquatState::Up)
                | (SquatState::Up, SquatState::Descending)
                | (SquatState::Descending, SquatState::Down)
                | (SquatState::Down, SquatState::Ascending)
                | (SquatState::Ascending, SquatState::Up)
        )
    }
}

impl fmt::Display for SquatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let inputs = [
            KneeState::Up,
            KneeState::Middle,
            KneeState::Down,
            KneeState::Middle,
            KneeState::Up,
        ];
        let expected = [
            (SquatState::Up, false),
            (SquatState::Descending, false),
            (SquatState::Down, false),
            (SquatState::Ascending, false),
            (SquatState::Up, true),
        ];

        let mut state = SquatState::Start;
        for (knee, (next, completed)) in inputs.iter().zip(expected.iter()) {
            let (s, c) = state.advance(*knee);
            assert_eq!(s, *next);
            assert_eq!(c, *completed);
            state = s;
        }
    }

    #[test]
    fn test_unmatched_inputs_are_self_loops() {
        // 表の5エッジ以外はすべて (self, false)
        for state in SquatState::ALL {
            for knee in KneeState::ALL {
                let is_edge = matches!(
                    (state, knee),
                    (SquatState::Start, KneeState::Up)
                        | (SquatState::Up, KneeState::Middle)
                        | (SquatState::Descending, KneeState::Down)
                        | (SquatState::Down, KneeState::Middle)
                        | (SquatState::Ascending, KneeState::Up)
                );
                if !is_edge {
                    assert_eq!(state.advance(knee), (state, false));
                }
            }
        }
    }

    #[test]
    fn test_partial_descent_does_not_complete() {
        // start → up → descending で止まり、up入力では動かない
        let (s, _) = SquatState::Start.advance(KneeState::Up);
        let (s, _) = s.advance(KneeState::Middle);
        assert_eq!(s, SquatState::Descending);
        let (s, completed) = s.advance(KneeState::Up);
        assert_eq!(s, SquatState::Descending);
        assert!(!completed);
    }

    #[test]
    fn test_only_ascending_to_up_completes() {
        for state in SquatState::ALL {
            for knee in KneeState::ALL {
                let (_, completed) = state.advance(knee);
                if completed {
                    assert_eq!(state, SquatState::Ascending);
                    assert_eq!(knee, KneeState::Up);
                }
            }
        }
    }

    #[test]
    fn test_can_follow_self_loop() {
        for state in SquatState::ALL {
            assert!(state.can_follow(state));
        }
    }

    #[test]
    fn test_can_follow_edges() {
        assert!(SquatState::Start.can_follow(SquatState::Up));
        assert!(SquatState::Up.can_follow(SquatState::Descending));
        assert!(SquatState::Descending.can_follow(SquatState::Down));
        assert!(SquatState::Down.can_follow(SquatState::Ascending));
        assert!(SquatState::Ascending.can_follow(SquatState::Up));

        // downからupへは1ステップでは到達できない
        assert!(!SquatState::Down.can_follow(SquatState::Up));
        assert!(!SquatState::Up.can_follow(SquatState::Down));
        assert!(!SquatState::Ascending.can_follow(SquatState::Start));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(SquatState::Start.to_string(), "start");
        assert_eq!(SquatState::Descending.to_string(), "descending");
        let json = serde_json::to_string(&SquatState::Ascending).unwrap();
        assert_eq!(json, "\"ascending\"");
        let back: SquatState = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(back, SquatState::Down);
    }
}
