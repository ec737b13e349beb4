use image::{GenericImageView, GrayImage};
use imageproc::rect::Rect;

pub fn crop_region(img: &GrayImage, rect: &Rect) -> Option<GrayImage> {
    let (width, height) = img.dimensions();
    let left = rect.left().clamp(0, width as i32) as u32;
    let top = rect.top().clamp(0, height as i32) as u32;
    let right = (rect.left() + rect.width() as i32).clamp(0, width as i32) as u32;
    let bottom = (rect.top() + rect.height() as i32).clamp(0, height as i32) as u32;

    if right <= left || bottom <= top {
        return None;
    }

    Some(img.view(left, top, right - left, bottom - top).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn crops_inside_region() {
        let img = GrayImage::from_fn(100, 80, |x, y| Luma([(x + y) as u8]));
        let crop = crop_region(&img, &Rect::at(10, 20).of_size(30, 40)).unwrap();

        assert_eq!(crop.dimensions(), (30, 40));
        assert_eq!(crop.get_pixel(0, 0), &Luma([30]));
        assert_eq!(crop.get_pixel(29, 39), &Luma([98]));
    }

    #[test]
    fn clamps_to_image_bounds() {
        let img = GrayImage::new(100, 80);
        let crop = crop_region(&img, &Rect::at(-10, 60).of_size(50, 50)).unwrap();
        assert_eq!(crop.dimensions(), (40, 20));

        assert!(crop_region(&img, &Rect::at(120, 10).of_size(10, 10)).is_none());
    }
}
