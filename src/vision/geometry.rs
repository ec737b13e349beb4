use imageproc::{point::Point, rect::Rect};

/// Closed outline; the last point joins the first.
pub type Polygon = Vec<Point<i32>>;

/// Four corners of `rect` clockwise from the top-left.
pub fn rect_polygon(rect: &Rect) -> Polygon {
    let (left, top) = (rect.left(), rect.top());
    let (right, bottom) = (left + rect.width() as i32, top + rect.height() as i32);
    vec![
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ]
}

pub fn translate(points: &[Point<i32>], offset: Point<i32>) -> Polygon {
    points
        .iter()
        .map(|p| Point::new(p.x + offset.x, p.y + offset.y))
        .collect()
}

/// Smallest axis-aligned rectangle covering every point, pixel-inclusive.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_polygon_is_clockwise_from_top_left() {
        let poly = rect_polygon(&Rect::at(10, 20).of_size(30, 40));
        assert_eq!(
            poly,
            vec![
                Point::new(10, 20),
                Point::new(40, 20),
                Point::new(40, 60),
                Point::new(10, 60),
            ]
        );
    }

    #[test]
    fn translate_shifts_every_point() {
        let moved = translate(&[Point::new(1, 2), Point::new(3, 4)], Point::new(100, 50));
        assert_eq!(moved, vec![Point::new(101, 52), Point::new(103, 54)]);
    }

    #[test]
    fn bounding_rect_is_inclusive() {
        let rect = bounding_rect(&[Point::new(5, 5), Point::new(14, 5), Point::new(9, 24)]).unwrap();
        assert_eq!((rect.left(), rect.top()), (5, 5));
        assert_eq!((rect.width(), rect.height()), (10, 20));
        assert!(bounding_rect(&[]).is_none());
    }
}
