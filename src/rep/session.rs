use super::fsm::SquatState;
use super::knee::KneeState;

/// 1人分のセッション（FSM状態とレップ数）
///
/// フレームループを回す側が所有し、呼び出しごとに持ち回す。
/// ローカルモードではプロセス内変数、ネットワークモードではクライアントが
/// リクエストに載せて往復させる。グローバル変数は使わない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    state: SquatState,
    reps: u32,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SquatState::Start,
            reps: 0,
        }
    }

    /// ワイヤから受け取った(状態, レップ数)でセッションを再構築する
    ///
    /// サーバ側で使う。サーバはリクエスト間で状態を持たない。
    pub fn resume(state: SquatState, reps: u32) -> Self {
        Self { state, reps }
    }

    pub fn state(&self) -> SquatState {
        self.state
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    /// 膝状態を1フレームぶん反映する。レップが完了したらtrue。
    pub fn observe(&mut self, knee: KneeState) -> bool {
        let (next, completed) = self.state.advance(knee);
        self.state = next;
        if completed {
            self.reps += 1;
        }
        completed
    }

    /// サーバ応答の(状態, レップ数)を検証つきで適用する
    ///
    /// 現在状態から1ステップで到達可能な場合のみ受理してtrueを返す。
    /// HTTP/TCP応答は送信順と異なる順序で届きうるため、到達不能な状態は
    /// 古い結果とみなして黙って破棄する。受理されるまでローカル値が正。
    pub fn apply_remote(&mut self, state: SquatState, reps: u32) -> bool {
        if !self.state.can_follow(state) {
            return false;
        }
        self.state = state;
        self.reps = reps;
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_counts_one_rep() {
        let mut session = Session::new();
        let inputs = [
            KneeState::Up,
            KneeState::Middle,
            KneeState::Down,
            KneeState::Middle,
            KneeState::Up,
        ];
        let mut completions = Vec::new();
        for knee in inputs {
            completions.push(session.observe(knee));
        }
        assert_eq!(completions, [false, false, false, false, true]);
        assert_eq!(session.reps(), 1);
        assert_eq!(session.state(), SquatState::Up);
    }

    #[test]
    fn test_partial_cycle_counts_nothing() {
        let mut session = Session::new();
        // 降りきらずに戻る: start → up → descending のまま
        session.observe(KneeState::Up);
        session.observe(KneeState::Middle);
        session.observe(KneeState::Up);
        assert_eq!(session.state(), SquatState::Descending);
        assert_eq!(session.reps(), 0);
    }

    #[test]
    fn test_two_cycles() {
        let mut session = Session::new();
        let cycle = [
            KneeState::Middle,
            KneeState::Down,
            KneeState::Middle,
            KneeState::Up,
        ];
        session.observe(KneeState::Up);
        for knee in cycle {
            session.observe(knee);
        }
        for knee in cycle {
            session.observe(knee);
        }
        assert_eq!(session.reps(), 2);
    }

    #[test]
    fn test_apply_remote_rejects_unreachable() {
        // downにいるクライアントがupを主張する応答を受けた場合は破棄
        let mut session = Session::resume(SquatState::Down, 3);
        assert!(!session.apply_remote(SquatState::Up, 4));
        assert_eq!(session.state(), SquatState::Down);
        assert_eq!(session.reps(), 3);
    }

    #[test]
    fn test_apply_remote_accepts_reachable() {
        let mut session = Session::resume(SquatState::Down, 3);
        assert!(session.apply_remote(SquatState::Ascending, 3));
        assert_eq!(session.state(), SquatState::Ascending);

        // 自己ループも受理
        assert!(session.apply_remote(SquatState::Ascending, 3));

        // レップ完了エッジ
        assert!(session.apply_remote(SquatState::Up, 4));
        assert_eq!(session.reps(), 4);
    }
}
