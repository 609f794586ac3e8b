use super::keypoint::{KeypointIndex, Pose};

/// 2D点（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// ゼロ長ベクトル判定のしきい値
const MIN_RAY_LENGTH: f32 = 1e-6;

/// 点bにおける b→a と b→c のなす角（度、0〜180）
///
/// 内積/arccosで計算。浮動小数点誤差対策でcosは[-1, 1]にクランプする。
/// どちらかのベクトルがゼロ長（a==b または c==b）なら測定不能としてNone。
pub fn angle_at_vertex(a: Point2, b: Point2, c: Point2) -> Option<f32> {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);

    let norm_ba = (ba.0 * ba.0 + ba.1 * ba.1).sqrt();
    let norm_bc = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();
    if norm_ba < MIN_RAY_LENGTH || norm_bc < MIN_RAY_LENGTH {
        return None;
    }

    let cos = ((ba.0 * bc.0 + ba.1 * bc.1) / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Poseから膝角度（hip-knee-ankle）を度で求める
///
/// 正規化座標のままだとアスペクト比で角度が歪むため、フレームの
/// ピクセル座標に変換してから計算する。左脚を優先し、左脚の
/// キーポイントの信頼度が足りなければ右脚にフォールバック。
/// どちらの脚も測れなければNone。
pub fn knee_angle(
    pose: &Pose,
    frame_w: u32,
    frame_h: u32,
    confidence_threshold: f32,
) -> Option<f32> {
    leg_angle(
        pose,
        KeypointIndex::LeftHip,
        KeypointIndex::LeftKnee,
        KeypointIndex::LeftAnkle,
        frame_w,
        frame_h,
        confidence_threshold,
    )
    .or_else(|| {
        leg_angle(
            pose,
            KeypointIndex::RightHip,
            KeypointIndex::RightKnee,
            KeypointIndex::RightAnkle,
            frame_w,
            frame_h,
            confidence_threshold,
        )
    })
}

fn leg_angle(
    pose: &Pose,
    hip: KeypointIndex,
    knee: KeypointIndex,
    ankle: KeypointIndex,
    frame_w: u32,
    frame_h: u32,
    confidence_threshold: f32,
) -> Option<f32> {
    let hip = pose.get(hip);
    let knee = pose.get(knee);
    let ankle = pose.get(ankle);

    if !hip.is_valid(confidence_threshold)
        || !knee.is_valid(confidence_threshold)
        || !ankle.is_valid(confidence_threshold)
    {
        return None;
    }

    angle_at_vertex(
        hip.to_point(frame_w, frame_h),
        knee.to_point(frame_w, frame_h),
        ankle.to_point(frame_w, frame_h),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::keypoint::Keypoint;

    #[test]
    fn test_right_angle() {
        let a = Point2::new(0.0, 1.0);
        let b = Point2::new(0.0, 0.0);
        let c = Point2::new(1.0, 0.0);
        let angle = angle_at_vertex(a, b, c).unwrap();
        assert!((angle - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_collinear_straight() {
        let a = Point2::new(-1.0, 0.0);
        let b = Point2::new(0.0, 0.0);
        let c = Point2::new(1.0, 0.0);
        let angle = angle_at_vertex(a, b, c).unwrap();
        assert!((angle - 180.0).abs() < 0.001);
    }

    #[test]
    fn test_collinear_folded() {
        let a = Point2::new(1.0, 1.0);
        let b = Point2::new(0.0, 0.0);
        let c = Point2::new(2.0, 2.0);
        let angle = angle_at_vertex(a, b, c).unwrap();
        assert!(angle.abs() < 0.001);
    }

    #[test]
    fn test_degenerate_returns_none() {
        let b = Point2::new(0.5, 0.5);
        assert_eq!(angle_at_vertex(b, b, Point2::new(1.0, 0.0)), None);
        assert_eq!(angle_at_vertex(Point2::new(1.0, 0.0), b, b), None);
    }

    fn leg_pose(hip: (f32, f32), knee: (f32, f32), ankle: (f32, f32), conf: f32) -> Pose {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::LeftHip as usize] = Keypoint::new(hip.0, hip.1, conf);
        keypoints[KeypointIndex::LeftKnee as usize] = Keypoint::new(knee.0, knee.1, conf);
        keypoints[KeypointIndex::LeftAnkle as usize] = Keypoint::new(ankle.0, ankle.1, conf);
        Pose::new(keypoints)
    }

    #[test]
    fn test_knee_angle_straight_leg() {
        // 正方形フレームで垂直に伸びた脚
        let pose = leg_pose((0.5, 0.2), (0.5, 0.5), (0.5, 0.8), 0.9);
        let angle = knee_angle(&pose, 100, 100, 0.3).unwrap();
        assert!((angle - 180.0).abs() < 0.001);
    }

    #[test]
    fn test_knee_angle_low_confidence() {
        let pose = leg_pose((0.5, 0.2), (0.5, 0.5), (0.5, 0.8), 0.1);
        assert_eq!(knee_angle(&pose, 100, 100, 0.3), None);
    }

    #[test]
    fn test_knee_angle_right_leg_fallback() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::RightHip as usize] = Keypoint::new(0.5, 0.2, 0.9);
        keypoints[KeypointIndex::RightKnee as usize] = Keypoint::new(0.5, 0.5, 0.9);
        keypoints[KeypointIndex::RightAnkle as usize] = Keypoint::new(0.8, 0.5, 0.9);
        let pose = Pose::new(keypoints);
        let angle = knee_angle(&pose, 100, 100, 0.3).unwrap();
        assert!((angle - 90.0).abs() < 0.001);
    }
}
