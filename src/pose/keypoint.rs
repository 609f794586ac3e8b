use super::angle::Point2;

/// MoveNet の 17 キーポイントインデックス (COCO順)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    /// ピクセル座標に変換
    pub fn to_point(&self, width: u32, height: u32) -> Point2 {
        Point2::new(self.x * width as f32, self.y * height as f32)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// 17キーポイントからなる姿勢
#[derive(Debug, Clone)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); KeypointIndex::COUNT],
        }
    }
}

/// バウンディングボックス（ピクセル座標、左上と右下の角）
///
/// 矩形表現はこの1種類に統一する。中心+幅高さ形式で受け取る側は
/// 境界でこの形式に変換すること。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// 有効なキーポイントのmin/maxから人物のBBoxを求める
///
/// confidence_threshold以上のキーポイントが2個未満ならNone。
pub fn bbox_from_keypoints(
    pose: &Pose,
    frame_w: u32,
    frame_h: u32,
    confidence_threshold: f32,
) -> Option<BBox> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut count = 0u32;

    for kp in &pose.keypoints {
        if kp.is_valid(confidence_threshold) {
            let p = kp.to_point(frame_w, frame_h);
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
            count += 1;
        }
    }

    if count < 2 {
        return None;
    }

    Some(BBox {
        x1: min_x,
        y1: min_y,
        x2: max_x,
        y2: max_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new(0.5, 0.5, 0.7);
        assert!(kp.is_valid(0.5));
        assert!(!kp.is_valid(0.8));
    }

    #[test]
    fn test_keypoint_to_point() {
        let kp = Keypoint::new(0.5, 0.25, 1.0);
        let p = kp.to_point(640, 480);
        assert_eq!(p.x, 320.0);
        assert_eq!(p.y, 120.0);
    }

    #[test]
    fn test_pose_get() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::LeftKnee as usize] = Keypoint::new(0.5, 0.3, 0.9);

        let pose = Pose::new(keypoints);
        let knee = pose.get(KeypointIndex::LeftKnee);
        assert_eq!(knee.x, 0.5);
        assert_eq!(knee.y, 0.3);
        assert_eq!(knee.confidence, 0.9);
    }

    #[test]
    fn test_bbox_from_keypoints() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[0] = Keypoint::new(0.2, 0.1, 0.9);
        keypoints[1] = Keypoint::new(0.6, 0.8, 0.9);
        let pose = Pose::new(keypoints);

        let bbox = bbox_from_keypoints(&pose, 100, 100, 0.5).unwrap();
        assert_eq!(bbox.x1, 20.0);
        assert_eq!(bbox.y1, 10.0);
        assert_eq!(bbox.x2, 60.0);
        assert_eq!(bbox.y2, 80.0);
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 70.0);
    }

    #[test]
    fn test_bbox_needs_two_valid_keypoints() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[0] = Keypoint::new(0.2, 0.1, 0.9);
        let pose = Pose::new(keypoints);
        assert!(bbox_from_keypoints(&pose, 100, 100, 0.5).is_none());
    }
}
