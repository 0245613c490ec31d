use super::*;

#[test]
fn new_image_is_transparent() {
    let image = Image::new(3, 2);
    assert_eq!(image.resolution(), Resolution::new(3, 2));
    assert_eq!(image.get(2, 1), Color::NULL);
}

#[test]
fn flip_horizontal() {
    let mut image = Image::new(3, 1);
    image.set(0, 0, Color::RED);
    image.set(2, 0, Color::BLUE);
    image.flip_horizontal_in_place();
    assert_eq!(image.get(0, 0), Color::BLUE);
    assert_eq!(image.get(1, 0), Color::NULL);
    assert_eq!(image.get(2, 0), Color::RED);
}

#[test]
fn pack_0rgb() {
    let image = Image::from_rgba8(Resolution::new(2, 1), &[1, 2, 3, 4, 255, 0, 128, 0]);
    let mut out = vec![0xdeadbeef];
    image.write_0rgb(&mut out);
    assert_eq!(out, [0x010203, 0xff0080]);
}

#[test]
fn save_rejects_unknown_extension() {
    let image = Image::new(1, 1);
    let err = image.save("snapshot.bmp").unwrap_err();
    assert!(err.to_string().contains("snapshot.bmp"), "{err}");
}

#[test]
fn draw_clips_to_image() {
    let mut image = Image::new(4, 4);
    draw::marker(&mut image, 0, 0).color(Color::YELLOW);
    draw::line(&mut image, -10, 1, 10, 1).color(Color::GREEN);
    for x in 0..4 {
        assert_eq!(image.get(x, 1), Color::GREEN);
    }
    assert_eq!(image.get(0, 0), Color::YELLOW);
    assert_eq!(image.get(2, 2), Color::YELLOW);
    assert_eq!(image.get(3, 3), Color::NULL);
}

#[test]
fn text_touches_pixels() {
    let mut image = Image::new(64, 32);
    draw::text(&mut image, 2, 2, "3").align_left().align_top().large();
    let touched = (0..32)
        .flat_map(|y| (0..64).map(move |x| (x, y)))
        .filter(|&(x, y)| image.get(x, y) == Color::RED)
        .count();
    assert!(touched > 0);
}
