use anyhow::Result;
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::imgproc;

use crate::pose::LabeledBox;
use crate::rep::{Session, SquatState};

/// SquatStateに対応する描画色（BGR）
///
/// 定義域は5状態すべて。ボックスとラベルの色分けに使う。
pub fn state_color(state: SquatState) -> Scalar {
    match state {
        SquatState::Up => Scalar::new(0.0, 255.0, 0.0, 0.0),
        SquatState::Down => Scalar::new(0.0, 255.0, 255.0, 0.0),
        SquatState::Start => Scalar::new(100.0, 100.0, 100.0, 0.0),
        SquatState::Descending => Scalar::new(0.0, 127.0, 127.0, 0.0),
        SquatState::Ascending => Scalar::new(0.0, 127.0, 0.0, 0.0),
    }
}

/// レップ数・膝角度・状態をフレーム左上に描画
pub fn draw_status(frame: &mut Mat, session: &Session, knee_angle: f32) -> Result<()> {
    put_text(
        frame,
        &format!("Reps: {}", session.reps()),
        Point::new(30, 30),
        1.0,
        Scalar::new(0.0, 255.0, 0.0, 0.0),
    )?;
    put_text(
        frame,
        &format!("Knee Angle: {}", knee_angle as i32),
        Point::new(30, 70),
        1.0,
        Scalar::new(0.0, 255.0, 255.0, 0.0),
    )?;
    put_text(
        frame,
        &format!("State: {}", session.state()),
        Point::new(30, 110),
        1.0,
        Scalar::new(255.0, 0.0, 0.0, 0.0),
    )?;
    Ok(())
}

/// 状態色でラベル付きボックスを描画
pub fn draw_boxes(frame: &mut Mat, boxes: &[LabeledBox], state: SquatState) -> Result<()> {
    let color = state_color(state);
    for labeled in boxes {
        let b = &labeled.bbox;
        let rect = Rect::new(
            b.x1 as i32,
            b.y1 as i32,
            b.width() as i32,
            b.height() as i32,
        );
        imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_AA, 0)?;
        put_text(
            frame,
            &format!("{}: {}", labeled.label, state),
            Point::new(b.x1 as i32, b.y1 as i32 - 10),
            0.9,
            color,
        )?;
    }
    Ok(())
}

fn put_text(frame: &mut Mat, text: &str, org: Point, scale: f64, color: Scalar) -> Result<()> {
    imgproc::put_text(
        frame,
        text,
        org,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        2,
        imgproc::LINE_AA,
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_color_total() {
        // 5状態すべてに色が割り当てられ、互いに異なる
        let colors: Vec<_> = SquatState::ALL
            .iter()
            .map(|s| {
                let c = state_color(*s);
                (c[0] as i32, c[1] as i32, c[2] as i32)
            })
            .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_state_color_values() {
        let up = state_color(SquatState::Up);
        assert_eq!((up[0], up[1], up[2]), (0.0, 255.0, 0.0));
        let down = state_color(SquatState::Down);
        assert_eq!((down[0], down[1], down[2]), (0.0, 255.0, 255.0));
    }
}
